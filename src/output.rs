//! Colored status output and the run summary table
//!
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative. If stdout/stderr is unavailable (broken
//! pipe, no TTY), the run continues without it.

use crate::config::CertConfig;
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Macro for printing warnings with yellow color
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use ::std::io::Write as _;
        use ::termcolor::WriteColor as _;
        let bufwtr = ::termcolor::BufferWriter::stderr(::termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(::termcolor::ColorSpec::new().set_fg(Some(::termcolor::Color::Yellow)));
        let _ = write!(&mut buffer, "⚠️  ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Macro for printing errors with red color
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use ::std::io::Write as _;
        use ::termcolor::WriteColor as _;
        let bufwtr = ::termcolor::BufferWriter::stderr(::termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(::termcolor::ColorSpec::new().set_fg(Some(::termcolor::Color::Red)));
        let _ = write!(&mut buffer, "❌ ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Macro for printing success messages with green color
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use ::std::io::Write as _;
        use ::termcolor::WriteColor as _;
        let bufwtr = ::termcolor::BufferWriter::stderr(::termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = buffer.set_color(::termcolor::ColorSpec::new().set_fg(Some(::termcolor::Color::Green)));
        let _ = write!(&mut buffer, "✓ ");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Macro for plain progress lines
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        use ::std::io::Write as _;
        let bufwtr = ::termcolor::BufferWriter::stderr(::termcolor::ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        let _ = writeln!(&mut buffer, $($arg)*);
        let _ = bufwtr.print(&buffer);
    }};
}

/// Print a `[VERBOSE]` line when verbose output is enabled
pub fn verbose(enabled: bool, msg: &str) {
    if !enabled {
        return;
    }
    let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();
    let _ = writeln!(&mut buffer, "[VERBOSE] {msg}");
    let _ = bufwtr.print(&buffer);
}

/// Rows shown in the summary table, in display order
#[must_use]
pub fn summary_rows(config: &CertConfig) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("username", config.username.clone()),
        ("development", config.development.to_string()),
        ("revoke_expired", config.revoke_expired.to_string()),
        ("force", config.force.to_string()),
        ("output_path", config.output_path.display().to_string()),
        ("keychain", config.keychain.clone()),
        ("common_name", config.common_name.clone()),
    ];

    if let Some(api) = &config.api {
        rows.push(("api_key_id", api.key_id.clone()));
        rows.push(("api_issuer_id", api.issuer_id.clone()));
        rows.push(("enterprise", api.enterprise.to_string()));
    }

    rows
}

/// Print the effective configuration before a run
pub fn print_summary(config: &CertConfig, version: &str) {
    let rows = summary_rows(config);
    let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
    let mut buffer = bufwtr.buffer();

    let _ = buffer.set_color(ColorSpec::new().set_bold(true));
    let _ = writeln!(&mut buffer, "Summary for kodegen_cert {version}");
    let _ = buffer.reset();
    let _ = writeln!(&mut buffer, "{}", "-".repeat(60));

    for (key, value) in rows {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(&mut buffer, "{key:<key_width$}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " | {value}");
    }

    let _ = writeln!(&mut buffer, "{}\n", "-".repeat(60));
    let _ = bufwtr.print(&buffer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeyConfig;
    use std::path::PathBuf;

    fn config() -> CertConfig {
        toml::from_str(
            r#"
            username = "ops@example.com"
            output_path = "/tmp/certs"
            revoke_expired = true
            "#,
        )
        .unwrap()
    }

    #[test]
    fn summary_lists_core_options() {
        let rows = summary_rows(&config());
        let keys: Vec<_> = rows.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            [
                "username",
                "development",
                "revoke_expired",
                "force",
                "output_path",
                "keychain",
                "common_name"
            ]
        );
        assert_eq!(rows[2].1, "true");
    }

    #[test]
    fn summary_includes_api_key_id_but_not_key_path() {
        let mut config = config();
        config.api = Some(ApiKeyConfig {
            issuer_id: "12345678-1234-1234-1234-123456789012".to_string(),
            key_id: "AB12CD34EF".to_string(),
            private_key_path: PathBuf::from("/secret/AuthKey.p8"),
            enterprise: false,
        });

        let rows = summary_rows(&config);
        assert!(rows.iter().any(|(k, v)| *k == "api_key_id" && v == "AB12CD34EF"));
        assert!(!rows.iter().any(|(_, v)| v.contains("/secret/")));
    }
}
