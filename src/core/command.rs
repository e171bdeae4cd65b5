//! Command parser for the : command system

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Navigation
    Tab(String),

    // Party actions; `None` targets the selected party
    Join(Option<u64>),
    Withdraw(Option<u64>),
    Create { name: String, fee: String },

    // Session
    Refresh,
    Connect,
    Disconnect,
    Quit,

    // Unknown command
    Unknown(String),
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.splitn(2, ' ');
    let cmd = parts.next().unwrap_or("");
    let args = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    match cmd.to_lowercase().as_str() {
        "tab" | "t" => match args {
            Some(name) => Command::Tab(name),
            None => Command::Unknown(input.to_string()),
        },
        "join" | "j" => match parse_index(args.as_deref()) {
            Ok(index) => Command::Join(index),
            Err(()) => Command::Unknown(input.to_string()),
        },
        "withdraw" | "wd" => match parse_index(args.as_deref()) {
            Ok(index) => Command::Withdraw(index),
            Err(()) => Command::Unknown(input.to_string()),
        },
        "create" | "new" => {
            // Last word is the fee; names may contain spaces
            let args = args.unwrap_or_default();
            match args.rsplit_once(' ') {
                Some((name, fee)) => Command::Create {
                    name: name.trim().to_string(),
                    fee: fee.to_string(),
                },
                None => Command::Create {
                    name: args,
                    fee: String::new(),
                },
            }
        }
        "refresh" | "r" => Command::Refresh,
        "connect" | "conn" => Command::Connect,
        "disconnect" | "dc" => Command::Disconnect,
        "quit" | "q" => Command::Quit,

        _ => Command::Unknown(input.to_string()),
    }
}

fn parse_index(arg: Option<&str>) -> Result<Option<u64>, ()> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .trim_start_matches('#')
            .parse()
            .map(Some)
            .map_err(|_| ()),
    }
}
