use clap::{arg, value_parser, Command};

pub fn get_args() -> Command {
    Command::new("rexplorer")
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(arg!(-v --debug "Print debug information").global(true))
        .subcommand(
            Command::new("connect")
                .about("Browse the directory tree served by a listing server")
                .arg(arg!(<ADDR> "Listing server address, host:port"))
                .arg(
                    arg!(--"base-url" <URL> "HTTP base used for download and stream links")
                        .required(false),
                )
                .arg(
                    arg!(--timeout <MS> "Folder download fetch timeout in milliseconds")
                        .required(false)
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    arg!(--"back-policy" <POLICY> "When the back button counts as enabled")
                        .required(false)
                        .value_parser(["legacy", "movable"]),
                )
                .arg(arg!(--sort <CRITERION> "Initial sort criterion").required(false))
                .arg(arg!(--root <PATH> "Path to open first").required(false))
                .arg_required_else_help(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_structure() {
        let app = get_args();
        assert_eq!(app.get_name(), "rexplorer");
        assert!(app.is_subcommand_required_set());
        assert!(app.is_arg_required_else_help_set());
    }

    #[test]
    fn test_connect_subcommand() {
        let app = get_args();
        let connect = app
            .get_subcommands()
            .find(|cmd| cmd.get_name() == "connect")
            .unwrap();
        assert!(connect.is_arg_required_else_help_set());
        assert_eq!(connect.get_arguments().count(), 6);
    }

    #[test]
    fn test_debug_flag() {
        let app = get_args();
        let debug = app.get_arguments().find(|arg| arg.get_id() == "debug");
        assert!(debug.is_some());
    }

    #[test]
    fn test_rejects_unknown_back_policy() {
        let result = get_args().try_get_matches_from([
            "rexplorer",
            "connect",
            "127.0.0.1:8888",
            "--back-policy",
            "sideways",
        ]);
        assert!(result.is_err());
    }
}
