use clap::Parser;

use amber_core::config::DEFAULT_GATEWAY_URL;

/// Ask the research agent a question through the invocation gateway.
///
/// Progress (status changes, tools in use, the agent's thinking) is printed
/// as it streams in, followed by the final report.
#[derive(Parser, Debug)]
#[command(name = "amber", about = "Stream a research query through the amber gateway")]
pub struct CliArgs {
    /// Research question to send
    pub query: String,

    /// Gateway base URL
    #[arg(long, env = "AMBER_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    pub gateway: String,

    /// Print each decoded event as a JSON line instead of rendering progress
    #[arg(long)]
    pub raw: bool,

    /// Do not echo the agent's thinking transcript
    #[arg(long)]
    pub no_thinking: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_and_flags() {
        let args = CliArgs::parse_from([
            "amber",
            "--raw",
            "--gateway",
            "http://gw:3000",
            "what changed in Rust 2024?",
        ]);
        assert_eq!(args.query, "what changed in Rust 2024?");
        assert_eq!(args.gateway, "http://gw:3000");
        assert!(args.raw);
        assert!(!args.no_thinking);
    }

    #[test]
    fn query_is_required() {
        assert!(CliArgs::try_parse_from(["amber"]).is_err());
    }
}
