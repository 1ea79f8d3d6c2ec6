use clap::{Arg, Command};

pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_BASE_PATH: &str = "base-path";
pub const ARG_HANDSHAKE_TTL_SECONDS: &str = "handshake-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public origin of the application, example: https://app.tld")
                .env("OIDC_GATE_PUBLIC_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASE_PATH)
                .long(ARG_BASE_PATH)
                .help("Path the application is mounted under")
                .env("OIDC_GATE_BASE_PATH")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_HANDSHAKE_TTL_SECONDS)
                .long(ARG_HANDSHAKE_TTL_SECONDS)
                .help("Lifetime of a pending login handshake in seconds")
                .env("OIDC_GATE_HANDSHAKE_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("OIDC_GATE_SESSION_TTL_SECONDS")
                .default_value("28800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}
