use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "DISPATCH_HOST",
        "DISPATCH_PORT",
        "DISPATCH_DATABASE_URL",
        "DISPATCH_DB_MAX_CONNECTIONS",
        "DISPATCH_EVENT_BUFFER_SIZE",
        "DISPATCH_DELIVERY_FEE",
        "DISPATCH_SERVICE_FEE_RATE",
        "DISPATCH_RIDER_EARNINGS_RATE",
        "DISPATCH_SEARCH_RADIUS_KM",
        "DISPATCH_MAX_CANDIDATES",
        "DISPATCH_MAX_ORDER_ITEMS",
        "DISPATCH_MAX_ITEM_QUANTITY",
        "DISPATCH_ACTIVE_ORDER_TTL_MINS",
        "DISPATCH_ORDER_TIMEOUT_MINS",
    ];

    println!("Current environment values:");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
