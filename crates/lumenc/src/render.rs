//! Ariadne-based rendering of accumulated errors.
//!
//! The driver's `UserError`s carry line/column locations; given the
//! original source text they render as labeled reports. Errors whose
//! source is unavailable fall back to the plain `path:line:col: message`
//! form.

use ariadne::{Config, Label, Report, ReportKind, Source};
use lumen_common::UserError;

/// Render one error against its source text.
///
/// Output is colorless so it is stable in test snapshots and logs.
pub fn render_diagnostic(error: &UserError, source: &str) -> String {
    let config = Config::default().with_color(false);
    let source_len = source.len();

    // Ariadne needs a non-empty span inside the source.
    let span_at = |offset: usize| -> std::ops::Range<usize> {
        let start = offset.min(source_len.saturating_sub(1));
        start..(start + 1).min(source_len).max(start)
    };

    let primary = span_at(error.location.byte_offset(source));
    let mut builder = Report::build(ReportKind::Error, primary.clone())
        .with_message(&error.message)
        .with_config(config)
        .with_label(Label::new(primary).with_message(&error.message));

    for info in &error.infos {
        // Notes from other files render as plain text below.
        if info.location.path != error.location.path {
            continue;
        }
        let range = span_at(info.location.byte_offset(source));
        builder.add_label(Label::new(range).with_message(&info.message));
    }

    let mut buf = Vec::new();
    let report = builder.finish();
    if report.write(Source::from(source), &mut buf).is_err() {
        return render_plain(error);
    }
    let mut out = String::from_utf8(buf).unwrap_or_else(|_| render_plain(error));
    for info in &error.infos {
        if info.location.path != error.location.path {
            out.push_str(&format!("{}: note: {}\n", info.location, info.message));
        }
    }
    out
}

/// The fallback `path:line:col` rendering when no source is available.
pub fn render_plain(error: &UserError) -> String {
    format!("{error}\n")
}

/// Render every error, looking sources up by path.
pub fn render_errors(
    errors: &[UserError],
    sources: &rustc_hash::FxHashMap<String, String>,
) -> String {
    let mut out = String::new();
    for error in errors {
        match sources.get(&error.location.path) {
            Some(source) => out.push_str(&render_diagnostic(error, source)),
            None => out.push_str(&render_plain(error)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::Location;

    #[test]
    fn renders_label_at_location() {
        let source = "let x = wrong\n";
        let err = UserError::new(Location::new("m.lm", 1, 9), "undefined identifier `wrong`");
        let rendered = render_diagnostic(&err, source);
        assert!(rendered.contains("undefined identifier"), "{rendered}");
    }

    #[test]
    fn plain_fallback_without_source() {
        let err = UserError::new(Location::new("gone.lm", 2, 1), "type mismatch");
        let rendered = render_errors(&[err], &rustc_hash::FxHashMap::default());
        assert_eq!(rendered, "gone.lm:2:1: error: type mismatch\n");
    }

    #[test]
    fn cross_file_notes_render_as_text() {
        let source = "x\n";
        let err = UserError::new(Location::new("a.lm", 1, 1), "duplicate declaration")
            .with_info(Location::new("b.lm", 3, 1), "previously declared here");
        let rendered = render_diagnostic(&err, source);
        assert!(rendered.contains("b.lm:3:1: note: previously declared here"), "{rendered}");
    }
}
