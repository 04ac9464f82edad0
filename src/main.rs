//! chattie CLI: drive per-guild Markov corpora from the command line, and
//! scale images with the cas command.
//!
//! Thin wrapper over the `chattie` and `cas` library crates. Everything is
//! stored under `--data-dir`; logs go to stderr.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use cas::{Cas, ImageSource, ScaleFactor};
use chattie::{
    Action, ChannelId, ChannelList, Chattie, DEFAULT_ORDER, FileConfigStore, FileCorpusStore,
    GuildId, IncomingMessage, MAX_MESSAGE_CHARS, MAX_ORDER, Settings, SpeakLimit, THINKING,
    UserId,
};
use clap::{ArgAction, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing_subscriber::EnvFilter;

/// User id the bot speaks as in `chat`.
const BOT_USER: UserId = UserId(0);
/// User id of whoever types into `chat`.
const CHAT_USER: UserId = UserId(1);
/// Lines containing this mention the bot in `chat`.
const MENTION: &str = "@chattie";

/// chattie: a per-guild Markov chain chat bot.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding corpora and guild settings.
    #[arg(long, global = true, default_value = "chattie-data")]
    data_dir: PathBuf,

    /// Chain order for newly created corpora.
    #[arg(long, global = true, default_value_t = DEFAULT_ORDER)]
    order: usize,

    /// PRNG seed for reproducible output.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Walks tried before giving up on a sentence.
    #[arg(long, global = true, default_value_t = 10)]
    max_attempts: usize,

    /// Longest walk, in words.
    #[arg(long, global = true, default_value_t = 1000)]
    max_length: usize,

    /// More logging (-v info, -vv debug, -vvv trace). CHATTIE_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a guild from a file of messages, one per line, newest first.
    Train {
        #[arg(long)]
        guild: u64,
        /// Replace the guild's corpus instead of merging into it.
        #[arg(long)]
        erase: bool,
        /// Messages to read (default 100).
        #[arg(long)]
        limit: Option<usize>,
        file: PathBuf,
    },
    /// Extend an existing corpus with one message.
    Learn {
        #[arg(long)]
        guild: u64,
        text: String,
    },
    /// Print one generated sentence.
    Speak {
        #[arg(long)]
        guild: u64,
    },
    /// Chat from stdin as a user in one channel; mention @chattie to get a reply.
    Chat {
        #[arg(long)]
        guild: u64,
        #[arg(long)]
        channel: u64,
        /// Wait the simulated typing time before each reply.
        #[arg(long)]
        pace: bool,
    },
    /// Show or change guild settings.
    Config {
        #[arg(long)]
        guild: u64,
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Scale an image file or URL.
    Cas {
        /// Scale factor between 0 and 2.
        #[arg(long, default_value_t = ScaleFactor::DEFAULT, allow_negative_numbers = true)]
        scale: f64,
        /// Image path or http(s) URL.
        input: String,
        /// Output path (default: result.<ext> in the current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the guild's settings.
    Show,
    /// Turn learning from conversation on or off.
    ToggleLearn,
    /// Manage the channels the bot learns from.
    LearnChannel {
        #[command(subcommand)]
        op: ListOp,
    },
    /// Manage the channels the bot may reply in.
    SpeakChannel {
        #[command(subcommand)]
        op: ListOp,
    },
}

#[derive(Subcommand, Debug)]
enum ListOp {
    Add { channel: u64 },
    Remove { channel: u64 },
    List,
}

type Bot = Chattie<FileCorpusStore, FileConfigStore, SmallRng>;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    });
    let settings = Settings {
        order: args.order,
        limit: SpeakLimit {
            max_attempts: args.max_attempts,
            max_length: args.max_length,
            max_chars: Some(MAX_MESSAGE_CHARS),
        },
        ..Settings::default()
    };
    anyhow::ensure!(
        (1..=MAX_ORDER).contains(&settings.order),
        "--order must be between 1 and {MAX_ORDER}"
    );

    let mut bot: Bot = Chattie::new(
        FileCorpusStore::new(&args.data_dir),
        FileConfigStore::new(&args.data_dir),
        settings,
        BOT_USER,
        SmallRng::seed_from_u64(seed),
    );

    match args.command {
        Command::Train {
            guild,
            erase,
            limit,
            file,
        } => train(&bot, GuildId(guild), erase, limit, &file),
        Command::Learn { guild, text } => learn(&bot, GuildId(guild), &text),
        Command::Speak { guild } => speak(&bot, GuildId(guild), seed),
        Command::Chat {
            guild,
            channel,
            pace,
        } => chat(&mut bot, GuildId(guild), ChannelId(channel), pace),
        Command::Config { guild, action } => config(&bot, GuildId(guild), action),
        Command::Cas {
            scale,
            input,
            output,
        } => scale_image(scale, &input, output),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("CHATTIE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn train(
    bot: &Bot,
    guild: GuildId,
    erase: bool,
    limit: Option<usize>,
    file: &Path,
) -> anyhow::Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let report = bot
        .train_channel(guild, text.lines(), limit, erase)
        .with_context(|| format!("training guild {guild} failed"))?;
    println!(
        "Successfully trained! {} sentences, {} states{}",
        report.sentences,
        report.states,
        if report.merged { " (merged)" } else { "" }
    );
    Ok(())
}

fn learn(bot: &Bot, guild: GuildId, text: &str) -> anyhow::Result<()> {
    let learned = bot
        .corpus()
        .learn(guild, text)
        .with_context(|| format!("learning for guild {guild} failed"))?;
    if !learned {
        eprintln!("guild {guild} has no corpus yet, nothing learned");
    }
    Ok(())
}

fn speak(bot: &Bot, guild: GuildId, seed: u64) -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let sentence = bot
        .corpus()
        .speak(guild, &bot.settings().limit, &mut rng)
        .with_context(|| format!("cannot speak for guild {guild}"))?;
    println!("{}", sentence.as_deref().unwrap_or(THINKING));
    Ok(())
}

fn chat(bot: &mut Bot, guild: GuildId, channel: ChannelId, pace: bool) -> anyhow::Result<()> {
    if !bot.corpus().has_corpus(guild)? {
        eprintln!("guild {guild} has no corpus yet; train it first to get replies");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        let message = IncomingMessage {
            guild: Some(guild),
            channel,
            author: CHAT_USER,
            content: trimmed.replace(MENTION, "").trim().to_owned(),
            mentions_bot: trimmed.contains(MENTION),
            is_command: false,
        };
        for Action::Say { text, typing, .. } in bot.handle_message(&message) {
            if pace {
                std::thread::sleep(typing);
            }
            writeln!(stdout, "chattie: {text}")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

fn config(bot: &Bot, guild: GuildId, action: ConfigAction) -> anyhow::Result<()> {
    let list_op = |list: ChannelList, op: ListOp| match op {
        ListOp::Add { channel } => bot.add_channel(guild, list, ChannelId(channel)),
        ListOp::Remove { channel } => bot.remove_channel(guild, list, ChannelId(channel)),
        ListOp::List => bot.list_channels(guild, list),
    };

    let reply = match action {
        ConfigAction::Show => {
            let config = bot.guild_config(guild)?;
            println!("learn: {}", config.learn);
            println!("learn channels: {}", channel_ids(&config.learn_channels));
            println!("speak channels: {}", channel_ids(&config.speak_channels));
            return Ok(());
        }
        ConfigAction::ToggleLearn => bot.toggle_learn(guild),
        ConfigAction::LearnChannel { op } => list_op(ChannelList::Learn, op),
        ConfigAction::SpeakChannel { op } => list_op(ChannelList::Speak, op),
    }
    .with_context(|| format!("updating settings of guild {guild} failed"))?;
    println!("{reply}");
    Ok(())
}

fn channel_ids(channels: &[ChannelId]) -> String {
    if channels.is_empty() {
        return "none".to_owned();
    }
    channels
        .iter()
        .map(ChannelId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn scale_image(scale: f64, input: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let source = match ImageSource::from_url(input) {
        Some(url) => url,
        None => ImageSource::Attachment(
            fs::read(input).with_context(|| format!("failed to read {input}"))?,
        ),
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let scaled = runtime
        .block_on(Cas::default().run(source, scale, |stage| {
            tracing::info!(%stage, "cas progress");
        }))
        .map_err(|e| {
            let status = e.status_line();
            anyhow::Error::new(e).context(status)
        })?;

    let output = output.unwrap_or_else(|| PathBuf::from(scaled.filename()));
    fs::write(&output, &scaled.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} ({}x{}, {} frame{})",
        output.display(),
        scaled.width,
        scaled.height,
        scaled.frames,
        if scaled.frames == 1 { "" } else { "s" }
    );
    Ok(())
}
