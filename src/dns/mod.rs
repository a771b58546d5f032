//! DNS packet handling: query classification and blocked replies.

pub mod parser;
pub mod response;

pub use parser::{ParsedDnsQuery, extract_domain, is_dns_query};
pub use response::build_blocked_response;
