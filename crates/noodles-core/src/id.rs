use snafu::Snafu;

use crate::define_id_type;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(display("Invalid id: {input:?}"))]
pub struct IdParseError {
    pub input: String,
}

define_id_type!(
    /// Id of a [`crate::post::Post`]
    struct PostId
);

define_id_type!(
    /// Id of a user, as handed out by the identity provider
    ///
    /// Both profiles and like rows are keyed by it.
    struct UserId
);
