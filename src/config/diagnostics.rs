//! Source-annotated diagnostics for configuration YAML.

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(fixture_cache::config::yaml))]
struct YamlDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

fn saturating_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

/// Byte offset of `loc` within `src`, clamped to the end of the text.
fn offset_of(src: &str, loc: Location) -> usize {
    let line_idx = saturating_usize(loc.line().saturating_sub(1));
    let column_idx = saturating_usize(loc.column().saturating_sub(1));
    let mut offset = 0;
    for (idx, segment) in src.split_inclusive('\n').enumerate() {
        if idx == line_idx {
            let line = segment.strip_suffix('\n').unwrap_or(segment);
            return offset
                + line
                    .char_indices()
                    .nth(column_idx)
                    .map_or(line.len(), |(byte_idx, _)| byte_idx);
        }
        offset += segment.len();
    }
    src.len()
}

fn span_at(src: &str, loc: Location) -> SourceSpan {
    let at = offset_of(src, loc);
    let len = usize::from(src.as_bytes().get(at).is_some_and(|b| *b != b'\n'));
    SourceSpan::new(at.into(), len)
}

fn indented_with_tabs(src: &str, loc: Location) -> bool {
    let line_idx = saturating_usize(loc.line().saturating_sub(1));
    src.lines().nth(line_idx).is_some_and(|line| {
        line.chars()
            .take_while(|c| c.is_whitespace())
            .any(|c| c == '\t')
    })
}

/// Wrap a YAML error with the offending source and a span pointing at it.
pub(super) fn yaml_diagnostic(
    err: YamlError,
    src: &str,
    name: &str,
) -> Box<dyn Diagnostic + Send + Sync + 'static> {
    let loc = err.location();
    let (line, column) = loc.map_or((1, 1), |l| (l.line(), l.column()));
    let help = loc
        .filter(|l| indented_with_tabs(src, *l))
        .map(|_| "Use spaces for indentation; tabs are invalid in YAML.".to_owned());
    let message = format!("YAML parse error in {name} at line {line}, column {column}: {err}");
    Box::new(YamlDiagnostic {
        src: NamedSource::new(name, src.to_owned()),
        span: loc.map(|l| span_at(src, l)),
        help,
        source: err,
        message,
    })
}
