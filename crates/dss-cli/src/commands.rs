use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use dss_layout::{
    check_compatibility, KeyEncoder, MappingDescriptor, MappingKey, NestedMappingDescriptor,
    SlotAddressSpace,
};
use dss_router::RouterConfig;
use dss_sdk::scenarios::{self, Outcome};
use dss_sdk::Workbench;
use dss_store::OwnerSnapshot;
use dss_types::{Address, Word, WordCodec};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RouterConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RouterConfig::default(),
    };
    debug!(?config, "router configuration");
    let out = Output { format: cli.format };
    match cli.command {
        Command::Layout(args) => cmd_layout(&out, &config, args),
        Command::Slot(args) => cmd_slot(&out, args.action),
        Command::Demo(args) => cmd_demo(&out, &config, args.scenario),
        Command::Snapshot(args) => cmd_snapshot(&out, &config, args.action),
        Command::Config => cmd_config(&out, &config),
    }
}

struct Output {
    format: OutputFormat,
}

impl Output {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn emit<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

fn short(word: &Word) -> String {
    word.to_short_hex()
}

// ---- layout ----

fn cmd_layout(out: &Output, config: &RouterConfig, args: LayoutArgs) -> anyhow::Result<()> {
    let bench = Workbench::with_config(config.clone())?;

    if let Some(against) = &args.against {
        let Some(module) = &args.module else {
            bail!("--against needs a module to compare");
        };
        let old = bench.descriptor(module)?;
        let new = bench.descriptor(against)?;
        let report = check_compatibility(&old, &new);
        if out.json() {
            return out.emit(&report);
        }
        let verdict = if report.is_compatible() {
            "compatible".green().bold()
        } else {
            "incompatible".red().bold()
        };
        println!("{} -> {}: {}", module.bold(), against.bold(), verdict);
        print!("{report}");
        return Ok(());
    }

    let labels: Vec<String> = match args.module {
        Some(label) => vec![label],
        None => bench.labels().map(str::to_string).collect(),
    };
    let mut layouts = Vec::with_capacity(labels.len());
    for label in labels {
        let descriptor = bench.descriptor(&label)?;
        if !out.json() {
            println!(
                "{} ({} slot(s), fingerprint {})",
                label.yellow().bold(),
                descriptor.slot_count(),
                short(&descriptor.fingerprint()).dimmed()
            );
            print!("{}", descriptor.render());
            println!();
        }
        layouts.push(json!({ "module": label, "layout": descriptor }));
    }
    if out.json() {
        out.emit(&layouts)?;
    }
    Ok(())
}

// ---- slot ----

fn parse_key(text: &str, kind: KeyType) -> anyhow::Result<MappingKey> {
    Ok(match kind {
        KeyType::Address => MappingKey::Address(Address::from_hex(text)?),
        KeyType::Uint => MappingKey::Uint(Word::parse(text)?),
        KeyType::Bool => MappingKey::Bool(text.parse().with_context(|| format!("'{text}' is not a bool"))?),
        KeyType::Bytes32 => {
            let bytes = hex::decode(text.trim_start_matches("0x"))?;
            if bytes.len() > 32 {
                bail!("bytes32 key is {} bytes long", bytes.len());
            }
            let mut raw = [0u8; 32];
            raw[..bytes.len()].copy_from_slice(&bytes);
            MappingKey::Bytes32(Word::from_bytes(raw))
        }
    })
}

fn encoder(kind: KeyType) -> KeyEncoder {
    match kind {
        KeyType::Address => KeyEncoder::Address,
        KeyType::Uint => KeyEncoder::Uint { width: 32 },
        KeyType::Bool => KeyEncoder::Bool,
        KeyType::Bytes32 => KeyEncoder::Bytes32,
    }
}

fn cmd_slot(out: &Output, action: SlotAction) -> anyhow::Result<()> {
    let space = SlotAddressSpace::default();
    let (label, base, slot) = match action {
        SlotAction::Mapping { base, key, key_type } => {
            let base = Word::parse(&base)?;
            let mapping = MappingDescriptor::new(base, encoder(key_type));
            let slot = mapping.slot_for(&space, &parse_key(&key, key_type)?)?;
            (format!("mapping[{key}]"), base, slot)
        }
        SlotAction::Nested {
            base,
            outer,
            inner,
            outer_type,
            inner_type,
        } => {
            let base = Word::parse(&base)?;
            let nested = NestedMappingDescriptor::new(
                MappingDescriptor::new(base, encoder(outer_type)),
                encoder(inner_type),
            );
            let slot = nested.slot_for(
                &space,
                &parse_key(&outer, outer_type)?,
                &parse_key(&inner, inner_type)?,
            )?;
            (format!("mapping[{outer}][{inner}]"), base, slot)
        }
        SlotAction::Array { base, index } => {
            let base = Word::parse(&base)?;
            let index = Word::parse(&index)?;
            let slot = space.array_element_slot(&base, &index);
            (format!("array[{}]", index.to_dec_string()), base, slot)
        }
    };

    if out.json() {
        return out.emit(&json!({
            "entry": label,
            "base": base,
            "slot": slot,
            "combine": format!("{:?}", space.version()),
        }));
    }
    println!("{} @ base {}", label.bold(), base.to_dec_string());
    println!("  slot: {}", slot.to_hex().cyan());
    Ok(())
}

// ---- demo ----

fn cmd_demo(out: &Output, config: &RouterConfig, demo: Demo) -> anyhow::Result<()> {
    match demo {
        Demo::Upgrade => {
            let report = scenarios::upgrade(config)?;
            if out.json() {
                return out.emit(&report);
            }
            println!("{} owner {}", "Upgrade".bold(), report.owner);
            println!("  {} -> {}", report.version_before.yellow(), report.version_after.yellow());
            println!("  layout check: {}", report.compat.summary());
            for (i, (before, after)) in report.slots_before.iter().zip(&report.slots_after).enumerate() {
                let mark = if before == after { " ".normal() } else { "*".red().bold() };
                println!("  {mark} slot {i}: {} -> {}", short(before), short(after));
            }
            println!(
                "  count {} -> {} ({} operation(s) since upgrade)",
                report.count_before.to_dec_string(),
                report.count_after.to_dec_string(),
                report.total_operations.to_dec_string()
            );
        }
        Demo::Broken => {
            let report = scenarios::broken(config)?;
            if out.json() {
                return out.emit(&report);
            }
            println!("{} owner {}", "Broken layout".bold(), report.owner);
            print!("{}", report.compat);
            match &report.guard_error {
                Some(err) => println!("  guarded rebind: {}", err.red()),
                None => println!("  guarded rebind: {}", "allowed (guard off)".yellow()),
            }
            println!("  count as seen by the module: {}", short(&report.count_as_seen));
            println!(
                "  slot 0 after increment: {} -> {}",
                short(&report.slot0_before),
                short(&report.slot0_after).red()
            );
            if let Some(err) = &report.next_call_error {
                println!("  next call: {}", err.red());
            }
            println!("  phase: {}", report.phase.to_string().red().bold());
        }
        Demo::Fallback => {
            let report = scenarios::fallback(config)?;
            if out.json() {
                return out.emit(&report);
            }
            println!("{}", "Receive / fallback routing".bold());
            for row in &report.rows {
                let outcome = match row.outcome {
                    Outcome::Operation => "operation".normal(),
                    Outcome::Receive => "receive".green(),
                    Outcome::Fallback => "fallback".cyan(),
                    Outcome::Unroutable => "unroutable".red(),
                };
                println!(
                    "  {:<24} {:<42} value {:<6} -> {}",
                    row.module,
                    row.call,
                    row.value.to_dec_string(),
                    outcome
                );
            }
        }
        Demo::Packing => {
            let report = scenarios::packing(config)?;
            if out.json() {
                return out.emit(&report);
            }
            for layout in &report.layouts {
                println!("{} ({} slot(s))", layout.label.yellow().bold(), layout.slot_count);
                for (slot, word) in layout.slots.iter().enumerate() {
                    println!("  slot {slot}: {}", word.to_hex().dimmed());
                }
            }
            println!("saved {} slot(s)", report.saved_slots.to_string().green().bold());
        }
        Demo::Mapping => {
            let report = scenarios::mapping(config)?;
            if out.json() {
                return out.emit(&report);
            }
            println!("{} owner {}", "Mapping slots".bold(), report.owner);
            for entry in &report.entries {
                let check = if entry.computed_slot == entry.reported_slot {
                    "ok".green()
                } else {
                    "MISMATCH".red().bold()
                };
                println!(
                    "  {:<18} {} = {} [{}]",
                    entry.variable,
                    short(&entry.computed_slot),
                    entry.stored.to_dec_string(),
                    check
                );
            }
            println!("  balance after raw slot write: {}", report.direct_write_balance.to_dec_string());
            println!("  holders: {}", report.holder_count.to_dec_string());
        }
    }
    Ok(())
}

// ---- snapshot ----

fn cmd_snapshot(out: &Output, config: &RouterConfig, action: SnapshotAction) -> anyhow::Result<()> {
    match action {
        SnapshotAction::Save {
            path,
            module,
            increments,
        } => {
            let bench = Workbench::with_config(config.clone())?;
            let admin = Address::derive("cli", b"admin");
            let owner = bench.deploy(admin, &module)?;
            bench.call(&owner, admin, "initialize", &[WordCodec::encode_address(&admin)])?;
            for _ in 0..increments {
                bench.call(&owner, admin, "increment", &[])?;
            }
            let digest = bench.save_snapshot(&owner, &path)?;
            if out.json() {
                return out.emit(&json!({ "owner": owner, "digest": digest, "path": path }));
            }
            println!("{} Saved owner {} to {}", "✓".green().bold(), owner, path.display());
            println!("  digest: {}", digest.to_hex().dimmed());
        }
        SnapshotAction::Verify { path } => {
            let snapshot = OwnerSnapshot::load(&path)?;
            let bench = Workbench::with_config(config.clone())?;
            let owner = bench.import(&snapshot)?;
            let phase = bench.phase(&owner)?;
            let module = bench.bound_label(&owner)?;
            if out.json() {
                return out.emit(&json!({
                    "owner": owner,
                    "module": module,
                    "phase": phase,
                    "slots": snapshot.slots.len(),
                    "digest": snapshot.digest()?,
                }));
            }
            println!("{} Snapshot digest verified", "✓".green().bold());
            println!("  owner:  {owner}");
            println!("  module: {}", module.as_deref().unwrap_or("<unregistered>").yellow());
            println!("  phase:  {phase}");
            println!("  slots:  {}", snapshot.slots.len());
        }
    }
    Ok(())
}

// ---- config ----

fn cmd_config(out: &Output, config: &RouterConfig) -> anyhow::Result<()> {
    if out.json() {
        return out.emit(config);
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
