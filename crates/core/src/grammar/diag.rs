pub use escpos_toolchain_diagnostics::{Diagnostic, Severity, Span, codes, explain};
