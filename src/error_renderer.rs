//! Renders internal errors against the source with ariadne.

use crate::{Diagnostic, Error, Severity};
use ariadne::{CharSet, ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

#[derive(Debug, Clone)]
pub struct RenderConfig<'a> {
    pub color: bool,
    /// Shown in location headers; `<unknown>` when absent.
    pub filename: Option<&'a str>,
    pub ascii: bool,
}

impl Default for RenderConfig<'_> {
    fn default() -> Self {
        Self {
            color: true,
            filename: None,
            ascii: false,
        }
    }
}

/// Writes `error` to `writer`. Internal errors get a report with the
/// offending span labelled in `source`; the others are a single line.
///
/// # Example
/// ```
/// use cinder::{Diagnostic, Error, RenderConfig, Severity, render_error_to};
/// use cinder::syntax::Span;
///
/// let error = Error::Internal {
///     method: "Run".to_string(),
///     diagnostic: Diagnostic {
///         severity: Severity::Error,
///         message: "unexpected yield break node during lowering".to_string(),
///         span: Span::new(0, 11),
///         related: vec![],
///         help: vec![],
///         code: Some("C0001".to_string()),
///     },
/// };
///
/// let mut buf = Vec::new();
/// let config = RenderConfig { color: false, ..Default::default() };
/// render_error_to(&error, "yield break;", &mut buf, &config).unwrap();
/// assert!(String::from_utf8_lossy(&buf).contains("[C0001] Error"));
/// ```
pub fn render_error_to(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    match error {
        Error::Internal { method, diagnostic } => {
            writeln!(writer, "while compiling `{}`:", method)?;
            render_diagnostic(source, diagnostic, writer, config)
        }
        Error::Api(msg) => writeln!(writer, "API error: {}", msg),
        Error::Encoding(msg) => writeln!(writer, "Encoding failed: {}", msg),
    }
}

fn render_diagnostic(
    source: &str,
    diag: &Diagnostic,
    writer: &mut dyn Write,
    config: &RenderConfig,
) -> std::io::Result<()> {
    let filename = config.filename.unwrap_or("<unknown>");
    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    };
    let report_config = ariadne::Config::default()
        .with_color(config.color)
        .with_char_set(if config.ascii { CharSet::Ascii } else { CharSet::Unicode });

    let mut report = Report::build(kind, (filename, diag.span.range()))
        .with_message(&diag.message)
        .with_config(report_config);
    if let Some(code) = &diag.code {
        report = report.with_code(code);
    }

    let mut colors = ColorGenerator::new();
    // Synthesized nodes carry no location.
    let located = core::iter::once((diag.span, &diag.message))
        .filter(|(span, _)| !span.is_empty())
        .chain(diag.related.iter().map(|related| (related.span, &related.message)));
    for (span, message) in located {
        report = report.with_label(
            Label::new((filename, span.range()))
                .with_message(message)
                .with_color(colors.next()),
        );
    }
    for help in &diag.help {
        report = report.with_help(help);
    }

    report
        .finish()
        .write((filename, Source::from(source)), &mut *writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{BoundBuilder, BoundMethod, LabelGen, LocalTable, Stmt, StmtKind};
    use crate::symbols::{MethodDef, MethodFlags, MethodKind, SymbolTable, TypeDef, TypeId, declare_core_library};
    use crate::syntax::Span;
    use crate::{CompileOptions, Compiler};
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    const PLAIN_CONFIG: RenderConfig = RenderConfig {
        color: false,
        filename: Some("Program.cs"),
        ascii: false,
    };

    const ASCII_CONFIG: RenderConfig = RenderConfig {
        color: false,
        filename: Some("Program.cs"),
        ascii: true,
    };

    /// Compiles `body` as a static void method of `kind` and renders the
    /// error it fails with.
    fn render_failure(
        kind: MethodKind,
        body: impl for<'a> Fn(BoundBuilder<'a>) -> Stmt<'a>,
        source: &str,
        config: &RenderConfig,
    ) -> String {
        let arena = Bump::new();
        let b = BoundBuilder::new(&arena);
        let mut symbols = SymbolTable::new();
        declare_core_library(&mut symbols);
        let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
        let method = symbols.add_method(
            MethodDef::new(owner, "Run", vec![], TypeId::VOID)
                .with_flags(MethodFlags::STATIC)
                .with_kind(kind),
        );

        let mut compiler = Compiler::new(&arena, symbols, CompileOptions::default());
        let bound = BoundMethod::new(method, b.alloc(body(b)), LocalTable::new(), LabelGen::new());
        let err = compiler.compile(bound, Default::default()).unwrap_err();

        let mut buf = Vec::new();
        render_error_to(&err, source, &mut buf, config).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn yield_break<'a>(b: BoundBuilder<'a>) -> Stmt<'a> {
        b.block(&[b.stmt(StmtKind::YieldBreak, Span::new(0, 11))])
    }

    #[test]
    fn test_internal_error_names_method_and_code() {
        let output = render_failure(MethodKind::Ordinary, yield_break, "yield break;", &PLAIN_CONFIG);
        assert!(output.starts_with("while compiling `Run`:\n"), "{output}");
        assert!(output.contains("[C0001] Error: unexpected yield break node during lowering"), "{output}");
        assert!(output.contains("Program.cs:1:1"), "{output}");
        assert!(output.contains("yield break;"), "{output}");
    }

    #[test]
    fn test_ascii_charset() {
        let output = render_failure(MethodKind::Ordinary, yield_break, "yield break;", &ASCII_CONFIG);
        assert!(output.contains(",-[ Program.cs:1:1 ]"), "{output}");
        assert!(!output.contains('╭'), "{output}");
    }

    #[test]
    fn test_help_is_rendered_as_note() {
        let source = "try {} finally { yield break; }";
        let output = render_failure(
            MethodKind::Iterator { element: TypeId::INT32 },
            |b| {
                let handler = b.block(&[b.stmt(StmtKind::YieldBreak, Span::new(17, 28))]);
                b.block(&[b.try_stmt(b.block(&[]), &[], Some(handler))])
            },
            source,
            &PLAIN_CONFIG,
        );
        assert!(output.contains("suspension point inside a catch or finally handler"), "{output}");
        assert!(output.contains("Help: move the await or yield out of the handler"), "{output}");
    }

    #[test]
    fn test_api_error_is_a_single_line() {
        let mut buf = Vec::new();
        render_error_to(&Error::Api("unknown method #7".to_string()), "", &mut buf, &PLAIN_CONFIG).unwrap();
        assert_eq!(String::from_utf8_lossy(&buf), "API error: unknown method #7\n");
    }
}
