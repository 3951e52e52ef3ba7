use crate::cli::{CliContext, TargetArgs};
use crate::constants;
use crate::core::store::{Removal, Upsert};
use crate::models::field::{FieldKind, ItemFields};
use crate::util::fs as vault_fs;
use anyhow::{bail, Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};
use dialoguer::Password;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::io::{Read, Write};
use std::path::PathBuf;
use zeroize::Zeroizing;

fn parse_secret_length(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("invalid length '{}'", s))?;
    if n == 0 || n > constants::MAX_SECRET_SIZE {
        return Err(format!("length must be between 1 and {}", constants::MAX_SECRET_SIZE));
    }
    Ok(n)
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Account or username
    pub account: String,

    /// Read secret from stdin instead of interactive prompt
    #[arg(long, conflicts_with = "generate")]
    pub from_stdin: bool,

    /// Generate a random alphanumeric secret of this length
    #[arg(long, value_name = "LENGTH", value_parser = parse_secret_length)]
    pub generate: Option<usize>,

    /// Leave the stored secret unchanged (update/upsert metadata only)
    #[arg(long, conflicts_with_all = ["from_stdin", "generate"])]
    pub keep_secret: bool,

    /// Label stored with the item
    #[arg(long)]
    pub label: Option<String>,

    /// Description stored with the item
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Account (defaults to the first item under the identifier)
    pub account: Option<String>,

    /// Output file (avoid stdout)
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Allow stdout output (dangerous)
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Args, Debug)]
pub struct FieldArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Field to read: account|data|label|description|generic
    #[arg(value_parser = clap::value_parser!(FieldKind))]
    pub field: FieldKind,

    /// Account (defaults to the first item under the identifier)
    #[arg(long)]
    pub account: Option<String>,

    /// Allow secret data on stdout (dangerous)
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Args, Debug)]
pub struct SetFieldArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Account or username
    pub account: String,

    /// Field to write: account|data|label|description|generic
    #[arg(value_parser = clap::value_parser!(FieldKind))]
    pub field: FieldKind,

    /// New value (omit to prompt or read stdin)
    pub value: Option<String>,

    /// Read the value from stdin
    #[arg(long, conflicts_with = "value")]
    pub from_stdin: bool,
}

#[derive(Args, Debug)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Account (defaults to the first item under the identifier)
    pub account: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Account to remove
    pub account: Option<String>,

    /// Remove every item under the identifier
    #[arg(long, conflicts_with = "account")]
    pub all: bool,
}

pub fn run_insert(ctx: &CliContext, args: WriteArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let fields = build_fields(ctx, &args)?;
    store
        .insert_fields(&args.account, &fields)
        .with_context(|| format!("insert '{}' into {}", args.account, store.identity()))?;
    println!("Inserted {} for {}", args.account, store.identity());
    Ok(())
}

pub fn run_update(ctx: &CliContext, args: WriteArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let fields = build_fields(ctx, &args)?;
    store
        .update_fields(&args.account, &fields)
        .with_context(|| format!("update '{}' in {}", args.account, store.identity()))?;
    println!("Updated {} for {}", args.account, store.identity());
    Ok(())
}

pub fn run_upsert(ctx: &CliContext, args: WriteArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let fields = build_fields(ctx, &args)?;
    let outcome = store
        .insert_or_update_fields(&args.account, &fields)
        .with_context(|| format!("upsert '{}' in {}", args.account, store.identity()))?;
    let verb = match outcome {
        Upsert::Inserted => "Inserted",
        Upsert::Updated => "Updated",
    };
    println!("{} {} for {}", verb, args.account, store.identity());
    Ok(())
}

pub fn run_get(ctx: &CliContext, args: GetArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let credential = store
        .fetch(args.account.as_deref())
        .with_context(|| format!("fetch from {}", store.identity()))?;

    if let Some(output) = args.output {
        vault_fs::write_atomic(&output, credential.password.as_bytes(), constants::ITEM_FILE_MODE)
            .with_context(|| format!("write {}", output.display()))?;
        println!("Wrote {}", output.display());
        return Ok(());
    }

    if !args.confirm {
        bail!("refusing to print secret to stdout without --confirm");
    }
    let mut stdout = std::io::stdout();
    stdout
        .write_all(credential.password.as_bytes())
        .context("write to stdout")?;
    stdout.flush().context("flush stdout")?;
    Ok(())
}

pub fn run_field(ctx: &CliContext, args: FieldArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    if args.field == FieldKind::Data && !args.confirm {
        bail!("refusing to print secret data to stdout without --confirm");
    }
    let value = store
        .field(args.account.as_deref(), args.field)
        .with_context(|| format!("read {} from {}", args.field, store.identity()))?;
    let Some(value) = value else {
        bail!("field '{}' is not set", args.field);
    };
    let mut stdout = std::io::stdout();
    stdout.write_all(&value).context("write to stdout")?;
    if !args.field.is_binary() {
        stdout.write_all(b"\n").context("write to stdout")?;
    }
    stdout.flush().context("flush stdout")?;
    Ok(())
}

pub fn run_set_field(ctx: &CliContext, args: SetFieldArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let value: Zeroizing<String> = match args.value {
        Some(value) => Zeroizing::new(value),
        None => {
            if ctx.non_interactive && !args.from_stdin {
                bail!("--non-interactive requires a value or --from-stdin for set-field");
            }
            read_secret(args.from_stdin, &format!("{} for {}", args.field, args.account))?
        }
    };
    store
        .set_field(&args.account, args.field, value.as_bytes())
        .with_context(|| format!("set {} of '{}' in {}", args.field, args.account, store.identity()))?;
    println!("Set {} of {} for {}", args.field, args.account, store.identity());
    Ok(())
}

pub fn run_describe(ctx: &CliContext, args: DescribeArgs) -> Result<()> {
    let keychain = ctx.keychain()?;
    let identity = args.target.resolve(&keychain)?;
    let store = keychain.store(identity);
    let account = args.account.as_deref();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Field").add_attribute(Attribute::Bold),
        Cell::new("Value").add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec!["identifier".to_string(), store.identity().identifier().to_string()]);
    table.add_row(vec![
        "group".to_string(),
        store.identity().access_group().unwrap_or("-").to_string(),
    ]);
    for kind in FieldKind::ALL {
        let value = store
            .field(account, kind)
            .with_context(|| format!("describe {}", store.identity()))?;
        let shown = match value {
            None => "-".to_string(),
            Some(bytes) if kind.is_binary() => format!("<{} bytes>", bytes.len()),
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        };
        table.add_row(vec![kind.to_string(), shown]);
    }
    println!("{}", table);
    Ok(())
}

pub fn run_remove(ctx: &CliContext, args: RemoveArgs) -> Result<()> {
    if args.account.is_none() && !args.all {
        bail!("specify an account, or --all to remove every item under the identifier");
    }
    let keychain = ctx.keychain()?;
    let store = keychain.store(args.target.resolve(&keychain)?);
    let removal = store
        .remove(args.account.as_deref())
        .with_context(|| format!("remove from {}", store.identity()))?;
    let what = args.account.as_deref().unwrap_or("all items");
    match removal {
        Removal::Removed => println!("Removed {} from {}", what, store.identity()),
        Removal::AlreadyAbsent => println!("Already absent: {} in {}", what, store.identity()),
    }
    Ok(())
}

pub fn run_prefix(ctx: &CliContext) -> Result<()> {
    let keychain = ctx.keychain()?;
    match keychain.sharing_prefix() {
        Ok(prefix) => println!("{}", prefix),
        Err(err) => println!("unavailable ({})", err),
    }
    Ok(())
}

fn build_fields(ctx: &CliContext, args: &WriteArgs) -> Result<ItemFields> {
    let mut fields = ItemFields::new();
    if !args.keep_secret {
        let secret = match args.generate {
            Some(length) => Zeroizing::new(generate_secret(length)),
            None => {
                if ctx.non_interactive && !args.from_stdin {
                    bail!("--non-interactive requires --from-stdin, --generate, or --keep-secret");
                }
                read_secret(args.from_stdin, &args.account)?
            }
        };
        fields = fields.data(secret.as_bytes());
    }
    if let Some(label) = &args.label {
        fields = fields.label(label.as_str());
    }
    if let Some(description) = &args.description {
        fields = fields.description(description.as_str());
    }
    Ok(fields)
}

fn read_secret(from_stdin: bool, prompt_for: &str) -> Result<Zeroizing<String>> {
    let secret = if from_stdin {
        let mut buf = Zeroizing::new(String::new());
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read secret from stdin")?;
        Zeroizing::new(buf.trim_end_matches(['\r', '\n']).to_string())
    } else {
        Zeroizing::new(
            Password::new()
                .with_prompt(format!("Secret for {}", prompt_for))
                .allow_empty_password(false)
                .interact()
                .context("read secret from prompt")?,
        )
    };
    if secret.len() > constants::MAX_SECRET_SIZE {
        bail!(
            "secret exceeds maximum size ({} bytes, max {} bytes)",
            secret.len(),
            constants::MAX_SECRET_SIZE
        );
    }
    Ok(secret)
}

fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
