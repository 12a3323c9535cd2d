use client_core::{ActionDispatcher, ActionOutcome, ActionReport, DispatchError, NftMetadata};
use shared::domain::{AccountAddress, Network};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  connect                    connect the wallet
  disconnect                 disconnect the wallet
  is-connected               ask the wallet whether it is connected
  account                    fetch the wallet account
  balance                    fetch the wallet balance
  network                    fetch the wallet network
  switch-network <name>      devnet | testnet | mainnet | local | custom
  sign-and-submit            fund the demo counterpart, then transfer to it
  sign-only                  sign a transfer in the wallet, submit it here
  sign-message <text>        sign a UTF-8 message
  mint <name>|<desc>|<uri>   mint one NFT to the connected account
  mint-batch                 mint two demo NFTs to the connected account
  transfer-nft <obj> <to>    move token object <obj> to <to>
  collection-exists <addr>   check whether <addr> created a collection
  owned-tokens [addr]        list tokens held by [addr] or the connected account
  help                       show this text
  quit                       exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    IsConnected,
    Account,
    Balance,
    Network,
    SwitchNetwork(Network),
    SignAndSubmit,
    SignOnly,
    SignMessage(String),
    MintNft(NftMetadata),
    MintBatch,
    TransferNft {
        object: AccountAddress,
        to: AccountAddress,
    },
    CollectionExists(AccountAddress),
    OwnedTokens(Option<AccountAddress>),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{command}: {message}")]
    InvalidArgument {
        command: &'static str,
        message: String,
    },
}

pub fn parse_command(line: &str) -> Result<Command, ParseCommandError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name {
        "" => Err(ParseCommandError::Empty),
        "connect" => Ok(Command::Connect),
        "disconnect" => Ok(Command::Disconnect),
        "is-connected" => Ok(Command::IsConnected),
        "account" => Ok(Command::Account),
        "balance" => Ok(Command::Balance),
        "network" => Ok(Command::Network),
        "switch-network" => {
            let raw = required(rest, "switch-network", "a network name")?;
            raw.parse()
                .map(Command::SwitchNetwork)
                .map_err(|err: shared::domain::UnknownNetwork| {
                    ParseCommandError::InvalidArgument {
                        command: "switch-network",
                        message: err.to_string(),
                    }
                })
        }
        "sign-and-submit" => Ok(Command::SignAndSubmit),
        "sign-only" => Ok(Command::SignOnly),
        "sign-message" => {
            let text = required(rest, "sign-message", "the message text")?;
            Ok(Command::SignMessage(text.to_string()))
        }
        "mint" => {
            let raw = required(rest, "mint", "name|description|uri")?;
            let mut fields = raw.splitn(3, '|').map(str::trim);
            match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(description), Some(uri)) if !name.is_empty() => {
                    Ok(Command::MintNft(NftMetadata {
                        name: name.to_string(),
                        description: description.to_string(),
                        uri: uri.to_string(),
                    }))
                }
                _ => Err(ParseCommandError::InvalidArgument {
                    command: "mint",
                    message: "expected name|description|uri".to_string(),
                }),
            }
        }
        "mint-batch" => Ok(Command::MintBatch),
        "transfer-nft" => {
            let raw = required(rest, "transfer-nft", "an object and a recipient address")?;
            let mut addresses = raw.split_whitespace();
            let (Some(object), Some(to), None) =
                (addresses.next(), addresses.next(), addresses.next())
            else {
                return Err(ParseCommandError::InvalidArgument {
                    command: "transfer-nft",
                    message: "expected <object> <to>".to_string(),
                });
            };
            Ok(Command::TransferNft {
                object: parse_address("transfer-nft", object)?,
                to: parse_address("transfer-nft", to)?,
            })
        }
        "collection-exists" => {
            let raw = required(rest, "collection-exists", "a creator address")?;
            parse_address("collection-exists", raw).map(Command::CollectionExists)
        }
        "owned-tokens" => {
            if rest.is_empty() {
                Ok(Command::OwnedTokens(None))
            } else {
                parse_address("owned-tokens", rest).map(|owner| Command::OwnedTokens(Some(owner)))
            }
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseCommandError::Unknown(other.to_string())),
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ParseCommandError> {
    if rest.is_empty() {
        Err(ParseCommandError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

fn parse_address(command: &'static str, raw: &str) -> Result<AccountAddress, ParseCommandError> {
    raw.parse()
        .map_err(|err: shared::domain::ParseHexError| ParseCommandError::InvalidArgument {
            command,
            message: err.to_string(),
        })
}

/// Runs a dispatcher-backed command. `Help` and `Quit` are handled by the caller.
pub async fn execute(
    dispatcher: &ActionDispatcher,
    command: Command,
) -> Option<Result<ActionOutcome, DispatchError>> {
    let result = match command {
        Command::Connect => dispatcher.connect().await,
        Command::Disconnect => dispatcher.disconnect().await,
        Command::IsConnected => dispatcher.is_connected().await,
        Command::Account => dispatcher.get_account().await,
        Command::Balance => dispatcher.get_balance().await,
        Command::Network => dispatcher.get_network().await,
        Command::SwitchNetwork(network) => dispatcher.switch_network(network).await,
        Command::SignAndSubmit => dispatcher.sign_and_submit().await,
        Command::SignOnly => dispatcher.sign_only().await,
        Command::SignMessage(text) => dispatcher.sign_message(&text).await,
        Command::MintNft(metadata) => dispatcher.mint_nft(metadata).await,
        Command::MintBatch => dispatcher.mint_batch().await,
        Command::TransferNft { object, to } => dispatcher.transfer_nft(object, to).await,
        Command::CollectionExists(creator) => dispatcher.collection_exists(creator).await,
        Command::OwnedTokens(owner) => dispatcher.owned_tokens(owner).await,
        Command::Help | Command::Quit => return None,
    };
    Some(result)
}

/// One line per report; prompts for the user are set apart from hard failures.
pub fn render_report(report: &ActionReport) -> String {
    match &report.outcome {
        Ok(outcome) => format!("[{}] {outcome}", report.action),
        Err(err) if err.is_user_prompt() => format!("[{}] ! {}", report.action, err.message),
        Err(err) => format!("[{}] error: {err}", report.action),
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
