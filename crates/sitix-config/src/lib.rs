//! Per-file render flags and the path-rewriting utilities shared by the
//! store, parser and render engine.

pub mod paths;

mod ident;
pub use ident::is_valid_identifier;

/// Per-file boolean flags that steer the writer pipeline (`minify`,
/// `markdown`) and the escape rule (`sitix`). Mutated at parse time by
/// `[@ on|off minify|markdown]` and copied onto every node parsed from the
/// owning file — nodes never consult their *caller's* flags, only the ones
/// in effect where they were parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fileflags {
    pub minify: bool,
    pub markdown: bool,
    /// Whether the escape-stripping stage (`\X` -> `X`) is active. Off for
    /// files copied verbatim (header is neither `[!]` nor `[?]`).
    pub sitix: bool,
}

impl Default for Fileflags {
    fn default() -> Self {
        // Matches a freshly-materialised Sitix file: no minify/markdown yet,
        // escape stripping active. Callers that determine the file is a
        // plain copy flip `sitix` off explicitly via `Fileflags::verbatim()`.
        Self {
            minify: false,
            markdown: false,
            sitix: true,
        }
    }
}

impl Fileflags {
    /// Flags for a file that is copied byte-for-byte (header is neither
    /// `[!]` nor `[?]`): the escape rule must not apply, or stray
    /// backslashes in non-Sitix source would be silently eaten.
    pub fn verbatim() -> Self {
        Self {
            minify: false,
            markdown: false,
            sitix: false,
        }
    }

    /// Apply a parsed `[@ on|off minify|markdown]` directive.
    pub fn apply(&mut self, op: FlagOp, name: FlagName) {
        let value = matches!(op, FlagOp::On);
        match name {
            FlagName::Minify => self.minify = value,
            FlagName::Markdown => self.markdown = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    On,
    Off,
}

impl FlagOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagName {
    Minify,
    Markdown,
}

impl FlagName {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minify" => Some(Self::Minify),
            "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sitix_only() {
        let f = Fileflags::default();
        assert!(f.sitix);
        assert!(!f.minify);
        assert!(!f.markdown);
    }

    #[test]
    fn verbatim_disables_sitix() {
        let f = Fileflags::verbatim();
        assert!(!f.sitix);
    }

    #[test]
    fn apply_toggles_named_flag_only() {
        let mut f = Fileflags::default();
        f.apply(FlagOp::On, FlagName::Minify);
        assert!(f.minify);
        assert!(!f.markdown);
        f.apply(FlagOp::Off, FlagName::Minify);
        assert!(!f.minify);
    }

    #[test]
    fn flag_name_and_op_parse() {
        assert_eq!(FlagOp::parse("on"), Some(FlagOp::On));
        assert_eq!(FlagOp::parse("off"), Some(FlagOp::Off));
        assert_eq!(FlagOp::parse("sideways"), None);
        assert_eq!(FlagName::parse("minify"), Some(FlagName::Minify));
        assert_eq!(FlagName::parse("markdown"), Some(FlagName::Markdown));
        assert_eq!(FlagName::parse("bogus"), None);
    }
}
