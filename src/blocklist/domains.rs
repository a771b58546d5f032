//! Plain domain list parser.

use std::io::BufRead;

use super::{BlocklistParser, ParseError};

/// Parser for files listing one domain per line.
///
/// Blank lines and `#` comments (whole-line or trailing) are skipped. Only
/// the first whitespace-separated token of a line is kept, so lists that
/// annotate domains after the name still load.
///
/// ```text
/// # gambling
/// bet365.com
/// casino.com   # added after relapse
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainListParser;

impl BlocklistParser for DomainListParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError> {
        let mut domains = Vec::new();
        let mut line = String::new();

        while reader.read_line(&mut line)? > 0 {
            let content = line.split('#').next().unwrap_or_default();
            if let Some(domain) = content.split_whitespace().next() {
                domains.push(domain.to_string());
            }
            line.clear();
        }

        Ok(domains)
    }
}
