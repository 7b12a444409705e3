use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context as _, Result};
use chrono::Utc;
use serde::Serialize;

use crate::config::{save_setting, Config};
use crate::data::{Adventure, AdventureStore, Bundle, BundleStore, Database, Quest, QuestStore};
use crate::engine::{
    CallOutcome, HttpDispatcher, Orchestrator, QuestError, Spell, SpellOutcome, DEFAULT_SPELL,
};
use crate::util;

use super::editor::edit_spell;
use super::{AdventureCommand, BundleArgs, BundleCommand, Command, ConfigCommand, QuestArgs};

/// Stores and settings shared by every command
struct Context {
    quests: QuestStore,
    adventures: AdventureStore,
    bundles: BundleStore,
    config: Config,
}

/// Execute a parsed command against the database in the data directory.
///
/// A [`QuestError`] anywhere in the error chain is reported with its kind,
/// e.g. `UndefinedVariable: undefined variable `host``.
pub async fn run(command: Command, config: Config) -> Result<()> {
    let result = match command {
        Command::Config(command) => config_command(command),
        Command::Adventure(command) => Context::open(config)?.adventure_command(command).await,
        Command::Create(args) => Context::open(config)?.create_quest(args),
        Command::Update(args) => Context::open(config)?.update_quest(args),
        Command::Spell {
            name,
            adventure,
            file,
        } => Context::open(config)?.spell_command(&name, &adventure, file),
        Command::List { adventure } => {
            print_json(&Context::open(config)?.adventure(&adventure)?.quests)
        }
        Command::Delete { name, adventure } => {
            Context::open(config)?.delete_quest(&name, &adventure)
        }
        Command::Vars { name, adventure } => Context::open(config)?.list_vars(&name, &adventure),
        Command::Call { name, adventure } => {
            Context::open(config)?.call_quest(&name, &adventure).await
        }
        Command::Bundle(command) => Context::open(config)?.bundle_command(command),
    };
    result.map_err(with_kind)
}

/// Prefix the message with the kind of the first [`QuestError`] in the chain
fn with_kind(err: anyhow::Error) -> anyhow::Error {
    let Some(quest_err) = err.chain().find_map(|e| e.downcast_ref::<QuestError>()) else {
        return err;
    };
    let tagged = format!("{}: {quest_err}", quest_err.kind());
    if err.is::<QuestError>() {
        anyhow!(tagged)
    } else {
        anyhow!("{err}: {tagged}")
    }
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let path = util::config_path();
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Set { key, value } => save_setting(&path, &key, &value)
            .with_context(|| format!("Failed to update {}", path.display())),
    }
}

impl Context {
    fn open(config: Config) -> Result<Self> {
        let db = Database::open(util::database_path()).context("Failed to open database")?;
        Ok(Self {
            quests: QuestStore::new(db.connection()),
            adventures: AdventureStore::new(db.connection()),
            bundles: BundleStore::new(db.connection()),
            config,
        })
    }

    async fn adventure_command(&self, command: AdventureCommand) -> Result<()> {
        match command {
            AdventureCommand::Create { name } => {
                if self.adventures.get_by_name(&name)?.is_some() {
                    bail!("adventure `{name}` already exists");
                }
                let adventure = Adventure::new(&name);
                self.adventures
                    .create(&adventure)
                    .context("Failed to create adventure")?;
                print_json(&adventure)
            }
            AdventureCommand::Get { name } => print_json(&self.adventure(&name)?),
            AdventureCommand::List => {
                let adventures = self.adventures.get_all().context("Failed to list adventures")?;
                print_json(&adventures)
            }
            AdventureCommand::Run { name } => self.run_adventure(&name).await,
        }
    }

    /// Call every quest in order, saving the bundle after each one
    async fn run_adventure(&self, name: &str) -> Result<()> {
        let mut adventure = self.adventure(name)?;
        let orchestrator = self.orchestrator()?;

        for quest in &adventure.quests {
            let outcome = orchestrator
                .call(quest, &mut adventure.bundle)
                .await
                .with_context(|| format!("Quest `{}` failed", quest.name))?;
            finish_call(outcome)?;
            self.save_bundle(&adventure)?;
        }

        tracing::info!(adventure = %name, quests = adventure.quests.len(), "Adventure complete");
        Ok(())
    }

    fn create_quest(&self, args: QuestArgs) -> Result<()> {
        let adventure = self.adventure(&args.adventure)?;
        if adventure.quest(&args.name).is_some() {
            bail!(
                "quest `{}` already exists in adventure `{}`",
                args.name,
                adventure.name
            );
        }

        let mut quest = Quest::new(&args.name, &args.method, &args.url);
        quest.data = to_map(args.data);
        quest.headers = to_map(args.headers);

        self.quests.create(&quest).context("Failed to create quest")?;
        self.adventures
            .add_quest(adventure.id, quest.id)
            .context("Failed to add quest to adventure")?;
        print_json(&quest)
    }

    fn update_quest(&self, args: QuestArgs) -> Result<()> {
        let adventure = self.adventure(&args.adventure)?;
        let mut quest = self.quest(&adventure, &args.name)?;

        quest.method = args.method;
        quest.url = args.url;
        quest.data = to_map(args.data);
        quest.headers = to_map(args.headers);
        quest.updated_at = Utc::now();

        self.quests.update(&quest).context("Failed to update quest")?;
        print_json(&quest)
    }

    /// Validate and store a spell; blank source removes it
    fn set_spell(&self, name: &str, adventure: &str, source: String) -> Result<()> {
        let adventure = self.adventure(adventure)?;
        let mut quest = self.quest(&adventure, name)?;

        quest.spell = if source.trim().is_empty() {
            None
        } else {
            Spell::parse(&source).context("Invalid spell; not saved")?;
            Some(source)
        };
        quest.updated_at = Utc::now();

        self.quests.update(&quest).context("Failed to save spell")?;
        tracing::info!(quest = %quest.name, "Saved spell");
        Ok(())
    }

    /// Read a spell from `file`, or open the current one in the editor
    fn spell_command(&self, name: &str, adventure: &str, file: Option<PathBuf>) -> Result<()> {
        let source = match file {
            Some(path) => fs::read_to_string(&path)
                .with_context(|| format!("Failed to read spell from {}", path.display()))?,
            None => {
                let quest = self.quest(&self.adventure(adventure)?, name)?;
                let current = quest.spell.unwrap_or_else(|| DEFAULT_SPELL.to_string());
                edit_spell(&self.config.editor_command(), &current)?
            }
        };
        self.set_spell(name, adventure, source)
    }

    fn delete_quest(&self, name: &str, adventure: &str) -> Result<()> {
        let quest = self.quest(&self.adventure(adventure)?, name)?;
        self.quests.delete(quest.id).context("Failed to delete quest")?;
        tracing::info!(quest = %name, adventure = %adventure, "Deleted quest");
        Ok(())
    }

    fn list_vars(&self, name: &str, adventure: &str) -> Result<()> {
        let adventure = self.adventure(adventure)?;
        let quest = self.quest(&adventure, name)?;
        let mut out = std::io::stdout().lock();
        for variable in quest.variables() {
            let state = if adventure.bundle.items.contains_key(&variable) {
                "defined"
            } else {
                "undefined"
            };
            writeln!(out, "{variable}: {state}")?;
        }
        Ok(())
    }

    async fn call_quest(&self, name: &str, adventure: &str) -> Result<()> {
        let mut adventure = self.adventure(adventure)?;
        let outcome = self.orchestrator()?.call_by_name(&mut adventure, name).await?;
        finish_call(outcome)?;
        self.save_bundle(&adventure)
    }

    fn bundle_command(&self, command: BundleCommand) -> Result<()> {
        match command {
            BundleCommand::Create(BundleArgs { adventure, items }) => {
                let adventure = self.adventure(&adventure)?;
                let bundle = Bundle::with_items(items.into_iter().collect());
                self.bundles
                    .create(adventure.id, &bundle)
                    .context("Failed to create bundle")?;
                print_json(&bundle)
            }
            BundleCommand::Update(BundleArgs { adventure, items }) => {
                let mut adventure = self.adventure(&adventure)?;
                adventure.bundle.merge(items.into_iter().collect());
                self.save_bundle(&adventure)?;
                print_json(&adventure.bundle)
            }
            BundleCommand::Get { adventure } => print_json(&self.adventure(&adventure)?.bundle),
        }
    }

    fn adventure(&self, name: &str) -> Result<Adventure> {
        self.adventures
            .get_by_name(name)
            .context("Failed to load adventure")?
            .ok_or_else(|| anyhow!("adventure `{name}` not found"))
    }

    fn quest(&self, adventure: &Adventure, name: &str) -> Result<Quest> {
        adventure.quest(name).cloned().ok_or_else(|| {
            QuestError::QuestNotFound {
                adventure: adventure.name.clone(),
                quest: name.to_string(),
            }
            .into()
        })
    }

    fn orchestrator(&self) -> Result<Orchestrator<HttpDispatcher>> {
        let dispatcher = HttpDispatcher::with_user_agent(&self.config.user_agent)?;
        Ok(Orchestrator::new(dispatcher))
    }

    fn save_bundle(&self, adventure: &Adventure) -> Result<()> {
        // Upsert so adventures loaded with a fallback bundle still persist
        self.bundles
            .create(adventure.id, &adventure.bundle)
            .context("Failed to save bundle")
    }
}

fn to_map(pairs: Vec<(String, String)>) -> Option<BTreeMap<String, String>> {
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.into_iter().collect())
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the response body, then surface a spell failure as the command error
fn finish_call(outcome: CallOutcome) -> Result<()> {
    write_body(outcome.body())?;
    match outcome.spell {
        SpellOutcome::Failed(err) => Err(err.into()),
        SpellOutcome::Skipped | SpellOutcome::Applied(_) => Ok(()),
    }
}

fn write_body(body: &[u8]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    out.write_all(body)?;
    if !body.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
