use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "gatekeeper")]
#[command(about = "GSM gate opener: SIM phonebook access control over a SIM800 modem")]
pub struct CliArgs {
    #[arg(short, long, default_value = "gatekeeper.toml")]
    pub config: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[arg(long, help = "Run against an in-memory SIM800 instead of the serial port")]
    pub simulate: bool,

    #[arg(long, help = "Validate the configuration and exit")]
    pub dry_run: bool,

    #[arg(long, help = "Print the SIM phonebook and exit")]
    pub list_contacts: bool,

    #[arg(long, help = "Skip power-on probing and GSM bring-up")]
    pub skip_bring_up: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::parse_from(["gatekeeper"]);
        assert_eq!(args.config, PathBuf::from("gatekeeper.toml"));
        assert!(!args.verbose);
        assert!(!args.simulate);
    }

    #[test]
    fn test_flags() {
        let args = CliArgs::parse_from([
            "gatekeeper",
            "--config",
            "/etc/gk.toml",
            "-v",
            "--simulate",
            "--list-contacts",
            "--skip-bring-up",
        ]);
        assert_eq!(args.config, PathBuf::from("/etc/gk.toml"));
        assert!(args.verbose);
        assert!(args.simulate);
        assert!(args.list_contacts);
        assert!(args.skip_bring_up);
        assert!(!args.dry_run);
    }
}
