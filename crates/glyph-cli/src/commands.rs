use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use glyph_crypto::KeyHasher;
use glyph_sdk::{BindBatch, Registry, RegistryConfig, SetBatch, SetItem};
use glyph_types::{Address, CanonicalKey, DomainId, FormatTag, Record, Slug};
use serde::Deserialize;
use serde_json::json;

use crate::cli::*;

struct Session {
    registry: Registry,
    signer: Address,
    format: OutputFormat,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if let Command::Key(args) = &cli.command {
        return cmd_key(args, cli.format);
    }

    let config = RegistryConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let registry = Registry::open(&config)
        .with_context(|| format!("opening registry in {}", config.data_dir.display()))?;
    let session = Session {
        registry,
        signer: config.effective_signer(),
        format: cli.format,
    };

    match cli.command {
        Command::Key(_) => Ok(()),
        Command::Set(args) => cmd_set(&session, args),
        Command::SetBatch(args) => cmd_set_batch(&session, args),
        Command::Bind(args) => cmd_bind(&session, args),
        Command::BindBatch(args) => cmd_bind_batch(&session, args),
        Command::BindDomain(args) => cmd_bind_domain(&session, args),
        Command::Get(args) => cmd_get(&session, args),
        Command::Info(args) => cmd_info(&session, args),
        Command::Version(args) => cmd_version(&session, args),
        Command::Resolve(args) => cmd_resolve(&session, args),
        Command::Uri(args) => cmd_uri(&session, args),
        Command::Count => cmd_count(&session),
        Command::List(args) => cmd_list(&session, args),
    }
}

fn cmd_key(args: &KeyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let key = KeyHasher::derive(&slug);
    match format {
        OutputFormat::Json => print_json(&json!({ "slug": slug, "key": key.to_hex() })),
        OutputFormat::Text => {
            println!("{}", key.to_hex());
            Ok(())
        }
    }
}

// ---- Mutations ----

fn cmd_set(session: &Session, args: SetArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let kind = match args.kind {
        Some(kind) => kind,
        None => infer_format(&args.path).ok_or_else(|| {
            anyhow!(
                "cannot infer format of {}; pass --type",
                args.path.display()
            )
        })?,
    };
    let data = fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;

    let record = session.registry.set(
        &session.signer,
        &slug,
        &data,
        args.width,
        args.height,
        kind,
    )?;
    session.registry.save_snapshot()?;

    match session.format {
        OutputFormat::Json => print_json(&record_json(&slug, &record)),
        OutputFormat::Text => {
            println!(
                "{} Stored {} as version {} ({} bytes)",
                "✓".green().bold(),
                slug.as_str().bold(),
                record.version.to_string().yellow(),
                data.len()
            );
            Ok(())
        }
    }
}

fn cmd_set_batch(session: &Session, args: SetBatchArgs) -> anyhow::Result<()> {
    let batch = load_manifest(&args.manifest)?;
    let slugs = batch.slugs.clone();
    let records = session.registry.set_batch(&session.signer, batch)?;
    session.registry.save_snapshot()?;

    match session.format {
        OutputFormat::Json => print_json(&json!(slugs
            .iter()
            .zip(&records)
            .map(|(slug, record)| record_json(slug, record))
            .collect::<Vec<_>>())),
        OutputFormat::Text => {
            for (slug, record) in slugs.iter().zip(&records) {
                println!("  {} {} v{}", "stored:".green(), slug, record.version);
            }
            println!("{} Batch of {} committed", "✓".green().bold(), records.len());
            Ok(())
        }
    }
}

fn cmd_bind(session: &Session, args: BindArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let domain = DomainId(args.domain);
    let key = session
        .registry
        .bind(&session.signer, args.entity, domain, &slug)?;
    session.registry.save_snapshot()?;

    match session.format {
        OutputFormat::Json => print_json(&json!({
            "entity": args.entity.to_hex(),
            "domain": domain.0,
            "slug": slug,
            "key": key.to_hex(),
        })),
        OutputFormat::Text => {
            println!(
                "{} Bound {} on domain {} → {}",
                "✓".green().bold(),
                args.entity.to_hex().cyan(),
                domain,
                slug.as_str().bold()
            );
            Ok(())
        }
    }
}

fn cmd_bind_batch(session: &Session, args: BindBatchArgs) -> anyhow::Result<()> {
    let batch = load_mapping(&args.mapping)?;
    let bound = session.registry.bind_batch(&session.signer, batch)?;
    session.registry.save_snapshot()?;

    match session.format {
        OutputFormat::Json => print_json(&json!({ "bound": bound })),
        OutputFormat::Text => {
            println!("{} Bound {} entities", "✓".green().bold(), bound);
            Ok(())
        }
    }
}

fn cmd_bind_domain(session: &Session, args: BindDomainArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let domain = DomainId(args.domain);
    let key = session
        .registry
        .bind_domain(&session.signer, domain, &slug)?;
    session.registry.save_snapshot()?;

    match session.format {
        OutputFormat::Json => print_json(&json!({
            "domain": domain.0,
            "slug": slug,
            "key": key.to_hex(),
        })),
        OutputFormat::Text => {
            println!(
                "{} Bound domain {} → {}",
                "✓".green().bold(),
                domain,
                slug.as_str().bold()
            );
            Ok(())
        }
    }
}

// ---- Queries ----

fn cmd_get(session: &Session, args: GetArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let key = KeyHasher::derive(&slug);
    let (record, data) = match args.version {
        Some(version) => (
            session.registry.record_version(&key, version)?,
            session.registry.get_version(&key, version)?,
        ),
        None => (session.registry.record(&key)?, session.registry.get(&key)?),
    };

    if let Some(out) = &args.out {
        fs::write(out, &data).with_context(|| format!("writing {}", out.display()))?;
    }

    match session.format {
        OutputFormat::Json => {
            let mut value = record_json(&slug, &record);
            value["len"] = json!(data.len());
            print_json(&value)
        }
        OutputFormat::Text => {
            let preview: String = data.iter().take(16).map(|b| format!("{b:02x}")).collect();
            println!(
                "{} v{} {} bytes {}{}",
                slug.as_str().bold(),
                record.version,
                data.len(),
                preview.dimmed(),
                if data.len() > 16 { "…" } else { "" }
            );
            if let Some(out) = &args.out {
                println!("  {} {}", "written:".green(), out.display());
            }
            Ok(())
        }
    }
}

fn cmd_info(session: &Session, args: SlugArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let key = KeyHasher::derive(&slug);
    let history = session.registry.history(&key)?;
    let position = session.registry.position(&key)?;

    match session.format {
        OutputFormat::Json => print_json(&json!({
            "slug": slug,
            "key": key.to_hex(),
            "position": position,
            "history": history
                .iter()
                .map(|record| record_json(&slug, record))
                .collect::<Vec<_>>(),
        })),
        OutputFormat::Text => {
            println!("{}", slug.as_str().bold());
            println!("  Key: {}", key.to_hex().cyan());
            if let Some(position) = position {
                println!("  Position: {position}");
            }
            for record in history.iter().rev() {
                println!(
                    "  {} {}x{} {}",
                    format!("v{}", record.version).yellow(),
                    record.width,
                    record.height,
                    record.content.to_string().dimmed()
                );
            }
            Ok(())
        }
    }
}

fn cmd_version(session: &Session, args: SlugArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let version = session
        .registry
        .current_version(&KeyHasher::derive(&slug))?;
    match session.format {
        OutputFormat::Json => print_json(&json!({ "slug": slug, "version": version })),
        OutputFormat::Text => {
            println!("{version}");
            Ok(())
        }
    }
}

fn cmd_resolve(session: &Session, args: ResolveArgs) -> anyhow::Result<()> {
    let domain = DomainId(args.domain);
    let key = match &args.entity {
        Some(entity) => session.registry.resolve(entity, domain)?,
        None => session.registry.resolve_domain(domain)?,
    };
    let Some(key) = key else {
        match &args.entity {
            Some(entity) => bail!("no binding for entity {entity} on domain {domain}"),
            None => bail!("no binding for domain {domain}"),
        }
    };
    let version = session.registry.current_version(&key)?;

    match session.format {
        OutputFormat::Json => print_json(&json!({
            "domain": domain.0,
            "entity": args.entity.map(|entity| entity.to_hex()),
            "key": key.to_hex(),
            "version": version,
        })),
        OutputFormat::Text => {
            println!("{} (v{})", key.to_hex().cyan(), version);
            Ok(())
        }
    }
}

fn cmd_uri(session: &Session, args: UriArgs) -> anyhow::Result<()> {
    let slug = parse_slug(&args.slug)?;
    let key = KeyHasher::derive(&slug);
    let mime = uri_mime(session, &args, &key)?;
    let uri = session.registry.data_uri(&key, &mime)?;
    match session.format {
        OutputFormat::Json => print_json(&json!({ "slug": slug, "uri": uri })),
        OutputFormat::Text => {
            println!("{uri}");
            Ok(())
        }
    }
}

/// `--mime`, else the MIME type of `--type`, else the detected format's.
fn uri_mime(session: &Session, args: &UriArgs, key: &CanonicalKey) -> anyhow::Result<String> {
    if let Some(mime) = &args.mime {
        return Ok(mime.clone());
    }
    let kind = match args.kind {
        Some(kind) => kind,
        None => session
            .registry
            .detect_format(key)?
            .ok_or_else(|| anyhow!("cannot detect the format of {}; pass --type", args.slug))?,
    };
    Ok(kind.mime().to_string())
}

fn cmd_count(session: &Session) -> anyhow::Result<()> {
    let count = session.registry.count()?;
    match session.format {
        OutputFormat::Json => print_json(&json!({ "count": count })),
        OutputFormat::Text => {
            println!("{count}");
            Ok(())
        }
    }
}

fn cmd_list(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let keys = session.registry.page(args.offset, args.limit)?;
    let versions = keys
        .iter()
        .map(|key| session.registry.current_version(key))
        .collect::<Result<Vec<_>, _>>()?;

    match session.format {
        OutputFormat::Json => print_json(&json!(keys
            .iter()
            .zip(&versions)
            .map(|(key, version)| json!({ "key": key.to_hex(), "version": version }))
            .collect::<Vec<_>>())),
        OutputFormat::Text => {
            if keys.is_empty() {
                println!("No keys.");
            }
            for (index, (key, version)) in keys.iter().zip(&versions).enumerate() {
                println!(
                    "{:>6}  {}  v{}",
                    args.offset + index as u64 + 1,
                    key.to_hex().cyan(),
                    version
                );
            }
            Ok(())
        }
    }
}

// ---- Input files ----

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    slug: String,
    path: PathBuf,
    width: u32,
    height: u32,
    format: FormatTag,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    entity: Address,
    domain: DomainId,
    slug: String,
}

/// Read an icon manifest. Relative paths resolve against the manifest's
/// directory.
fn load_manifest(path: &Path) -> anyhow::Result<SetBatch> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    entries
        .into_iter()
        .map(|entry| {
            let file = base.join(&entry.path);
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            Ok(SetItem {
                slug: parse_slug(&entry.slug)?,
                data,
                width: entry.width,
                height: entry.height,
                format: entry.format,
            })
        })
        .collect()
}

fn load_mapping(path: &Path) -> anyhow::Result<BindBatch> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: Vec<MappingEntry> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let mut batch = BindBatch::new();
    for entry in entries {
        batch.push(entry.entity, entry.domain, parse_slug(&entry.slug)?);
    }
    Ok(batch)
}

// ---- Helpers ----

fn parse_slug(raw: &str) -> anyhow::Result<Slug> {
    Slug::new(raw).with_context(|| format!("invalid slug {raw:?}"))
}

fn infer_format(path: &Path) -> Option<FormatTag> {
    path.extension()?.to_str()?.parse().ok()
}

fn record_json(slug: &Slug, record: &Record) -> serde_json::Value {
    let key: CanonicalKey = KeyHasher::derive(slug);
    json!({
        "slug": slug,
        "key": key.to_hex(),
        "version": record.version,
        "width": record.width,
        "height": record.height,
        "content": record.content.to_string(),
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
