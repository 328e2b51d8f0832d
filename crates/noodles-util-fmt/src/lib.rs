use std::fmt;

pub struct FmtOption<'r, O>(pub Option<&'r O>);

impl<O> fmt::Display for FmtOption<'_, O>
where
    O: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(o) => o.fmt(f),
            None => f.write_str("-"),
        }
    }
}

pub trait AsFmtOption {
    type Fmt: fmt::Display;
    fn fmt_option(self) -> Self::Fmt;
}

impl<'e, O> AsFmtOption for &'e Option<O>
where
    O: fmt::Display,
{
    type Fmt = FmtOption<'e, O>;

    fn fmt_option(self) -> Self::Fmt {
        FmtOption(self.as_ref())
    }
}

/// Format an age (in seconds) as a short relative string (e.g., "5m", "2h",
/// "3d").
///
/// For ages over 30 days, returns None, so the caller can fall back to an
/// absolute date.
pub fn format_age_relative(seconds: u64) -> Option<String> {
    if seconds < 60 {
        Some(format!("{seconds}s"))
    } else if seconds < 3600 {
        Some(format!("{}m", seconds / 60))
    } else if seconds < 86400 {
        Some(format!("{}h", seconds / 3600))
    } else if seconds < 2592000 {
        Some(format!("{}d", seconds / 86400))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_option_uses_dash_for_none() {
        let none: Option<u32> = None;
        assert_eq!((&none).fmt_option().to_string(), "-");
        assert_eq!((&Some(3)).fmt_option().to_string(), "3");
    }

    #[test]
    fn age_relative_buckets() {
        assert_eq!(format_age_relative(59).as_deref(), Some("59s"));
        assert_eq!(format_age_relative(60 * 5).as_deref(), Some("5m"));
        assert_eq!(format_age_relative(3600 * 2).as_deref(), Some("2h"));
        assert_eq!(format_age_relative(86400 * 3).as_deref(), Some("3d"));
        assert_eq!(format_age_relative(86400 * 31), None);
    }
}
