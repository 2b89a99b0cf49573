mod fetch;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

use dm_engine::aggregate::{display_cr, summary, total_cr, total_xp};
use dm_engine::combatant::CombatantUpdate;
use dm_engine::config::ConsoleConfig;
use dm_engine::player::PlayerUpdate;
use dm_engine::ports::AdventureStore;
use dm_engine::rules::PassiveSkill;
use dm_engine::{Action, AdMode, CombatantId, Dice, EncounterId, Outcome, Player, Session};

use crate::fetch::OfflineFetcher;
use crate::store::JsonDirStore;

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

#[derive(Args)]
struct Target {
    /// Adventure name
    adventure: String,
    /// Encounter name (case-insensitive)
    encounter: String,
}

#[derive(Subcommand)]
enum Cmd {
    /// List saved adventures
    List,
    /// Create an empty adventure
    New { adventure: String },
    /// Print players, chapters and encounters
    Show { adventure: String },
    /// Add a chapter
    ChapterAdd { adventure: String, chapter: String },
    /// Add a player to the party
    AddPlayer {
        adventure: String,
        name: String,
        #[arg(long, default_value_t = 0)]
        hp: i32,
        #[arg(long, default_value_t = 10)]
        ac: i32,
        #[arg(long, default_value_t = 0)]
        init_bonus: i32,
        #[arg(long, default_value_t = 1)]
        level: u32,
    },
    /// Create an encounter, in the first chapter unless --chapter is given
    AddEncounter {
        adventure: String,
        name: String,
        #[arg(long)]
        chapter: Option<String>,
    },
    /// Add monsters to an encounter and look up their stats
    AddMonster {
        #[command(flatten)]
        target: Target,
        monster: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Sort by initiative and begin round 1
    Start(Target),
    /// Advance to the next turn
    Next(Target),
    /// Step back one turn
    Prev(Target),
    /// End the encounter
    End(Target),
    /// Return a started or finished encounter to not started
    Reset(Target),
    /// Re-sync player rows with the party
    RefreshPlayers(Target),
    /// Damage a combatant
    Damage {
        #[command(flatten)]
        target: Target,
        combatant: String,
        amount: i32,
    },
    /// Heal a combatant
    Heal {
        #[command(flatten)]
        target: Target,
        combatant: String,
        amount: i32,
    },
    /// Roll treasure for an encounter
    Loot(Target),
    /// Show an encounter's XP and CR
    Xp {
        #[command(flatten)]
        target: Target,
        /// Print JSON instead of a summary line
        #[arg(long)]
        json: bool,
    },
    /// Roll a d20 multiple times with optional advantage/disadvantage
    Roll {
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
}

#[derive(Parser)]
#[command(name = "dm-console")]
#[command(about = "Dungeon Master console: adventures, encounters and initiative")]
struct Cli {
    /// YAML or JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of <adventure>.json files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// RNG seed for determinism
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// -v for info, -vv for debug
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Serialize)]
struct XpReport<'a> {
    encounter: &'a str,
    xp: u32,
    cr: String,
    total_cr: f64,
}

fn to_mode(a: Adv) -> AdMode {
    match a {
        Adv::Normal => AdMode::Normal,
        Adv::Advantage => AdMode::Advantage,
        Adv::Disadvantage => AdMode::Disadvantage,
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn open(config: &ConsoleConfig, store: &JsonDirStore, name: &str) -> Result<Session> {
    let mut session = Session::from_config(config)?;
    let report = session
        .load(store, name.trim())
        .await
        .with_context(|| format!("cannot open adventure {:?}", name))?;
    if !report.is_clean() {
        info!(?report, "repaired adventure on load");
    }
    Ok(session)
}

/// Print pending combat log lines, then save.
async fn finish(session: &mut Session, store: &JsonDirStore) -> Result<()> {
    for line in session.take_log() {
        println!("{}", line);
    }
    session.flush_now(store).await?;
    Ok(())
}

fn encounter_id(session: &Session, name: &str) -> Result<EncounterId> {
    let adventure = session.adventure().context("no adventure is open")?;
    adventure
        .encounters
        .iter()
        .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
        .map(|e| e.id)
        .with_context(|| format!("no encounter named {:?}", name))
}

fn combatant_id(session: &Session, encounter: EncounterId, name: &str) -> Result<CombatantId> {
    let adventure = session.adventure().context("no adventure is open")?;
    adventure
        .encounter(encounter)
        .context("encounter not found")?
        .combatants
        .iter()
        .find(|c| c.display_name(&adventure.players).eq_ignore_ascii_case(name.trim()))
        .map(|c| c.id)
        .with_context(|| format!("no combatant named {:?}", name))
}

fn print_encounter(session: &Session, id: EncounterId) {
    let Some(adventure) = session.adventure() else { return };
    let Some(enc) = adventure.encounter(id) else { return };
    println!("{}", summary(enc, session.catalog()));
    for c in &enc.combatants {
        let marker = if enc.active == Some(c.id) { ">" } else { " " };
        let mut line = format!(
            "{} {:<20} init {:>2}  HP {}/{}  AC {}",
            marker,
            c.display_name(&adventure.players),
            c.initiative,
            c.vitals.current_hp,
            c.vitals.max_hp,
            c.effective_ac(session.catalog())
        );
        if !c.conditions.is_empty() {
            let names: Vec<String> = c.conditions.iter().map(|k| k.to_string()).collect();
            line.push_str(&format!("  [{}]", names.join(", ")));
        }
        if c.concentrating {
            line.push_str("  (concentrating)");
        }
        println!("{}", line);
    }
    if !enc.treasure.is_empty() {
        println!("  treasure: {}", enc.treasure);
    }
}

fn show(session: &Session) {
    let Some(adventure) = session.adventure() else { return };
    println!("{}", adventure.name);
    if !adventure.players.is_empty() {
        println!("Players:");
        for p in &adventure.players {
            println!(
                "  {}  lvl {}  HP {}  AC {}  passive Perception {}",
                p.display_name,
                p.level,
                p.max_hp,
                p.ac,
                p.passive(PassiveSkill::Perception)
            );
        }
    }
    for chapter in &adventure.chapters {
        println!("== {} ==", chapter);
        let notes = adventure.chapter_notes(chapter);
        if !notes.is_empty() {
            println!("{}", notes);
        }
        for enc in adventure.encounters_in(chapter) {
            print_encounter(session, enc.id);
        }
    }
}

async fn turn(
    config: &ConsoleConfig,
    store: &JsonDirStore,
    target: Target,
    action: fn(EncounterId) -> Action,
) -> Result<()> {
    let mut session = open(config, store, &target.adventure).await?;
    let id = encounter_id(&session, &target.encounter)?;
    session.dispatch(action(id), Instant::now())?;
    for line in session.take_log() {
        println!("{}", line);
    }
    print_encounter(&session, id);
    finish(&mut session, store).await
}

async fn add_monster(
    config: &ConsoleConfig,
    store: &JsonDirStore,
    target: Target,
    monster: String,
    count: usize,
) -> Result<()> {
    let mut session = open(config, store, &target.adventure).await?;
    let enc = encounter_id(&session, &target.encounter)?;
    let now = Instant::now();
    let added = session.dispatch(
        Action::AddMonsters { encounter: enc, name: monster.clone(), quantity: count },
        now,
    )?;
    let ids = match added {
        Outcome::Combatants(ids) => ids,
        other => bail!("unexpected outcome adding monsters: {:?}", other),
    };
    if session.catalog().get(&monster).is_none() {
        // Unknown to the catalog: point the rows at the page they would have.
        let link = config.monster_ref_for(&monster);
        for id in &ids {
            session.dispatch(
                Action::UpdateCombatant {
                    encounter: enc,
                    combatant: *id,
                    update: CombatantUpdate::RemoteRef(Some(link.clone())),
                },
                now,
            )?;
        }
    }
    let fetcher = OfflineFetcher::new(session.catalog().clone());
    for id in ids {
        session.reconcile_combatant(&fetcher, enc, id).await;
    }
    finish(&mut session, store).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    let store = JsonDirStore::new(&config.data_dir);

    match cli.cmd {
        Cmd::List => {
            for name in store.list().await? {
                println!("{}", name);
            }
        }
        Cmd::New { adventure } => {
            store.create(&adventure).await?;
            println!("created adventure {}", adventure.trim());
        }
        Cmd::Show { adventure } => {
            let mut session = open(&config, &store, &adventure).await?;
            show(&session);
            finish(&mut session, &store).await?;
        }
        Cmd::ChapterAdd { adventure, chapter } => {
            let mut session = open(&config, &store, &adventure).await?;
            session.dispatch(Action::AddChapter(chapter), Instant::now())?;
            finish(&mut session, &store).await?;
        }
        Cmd::AddPlayer { adventure, name, hp, ac, init_bonus, level } => {
            let mut session = open(&config, &store, &adventure).await?;
            let now = Instant::now();
            let added = session.dispatch(Action::AddPlayer(Player::new(name.trim())), now)?;
            let player = match added {
                Outcome::Player(player) => player,
                other => bail!("unexpected outcome adding a player: {:?}", other),
            };
            for update in [
                PlayerUpdate::MaxHp(hp),
                PlayerUpdate::Ac(ac),
                PlayerUpdate::InitiativeBonus(init_bonus),
                PlayerUpdate::Level(level),
            ] {
                session.dispatch(Action::UpdatePlayer { player: player.clone(), update }, now)?;
            }
            println!("added player {}", name.trim());
            finish(&mut session, &store).await?;
        }
        Cmd::AddEncounter { adventure, name, chapter } => {
            let mut session = open(&config, &store, &adventure).await?;
            session.dispatch(
                Action::CreateEncounter { name: name.clone(), chapter },
                Instant::now(),
            )?;
            let id = encounter_id(&session, &name)?;
            print_encounter(&session, id);
            finish(&mut session, &store).await?;
        }
        Cmd::AddMonster { target, monster, count } => {
            add_monster(&config, &store, target, monster, count).await?;
        }
        Cmd::Start(target) => turn(&config, &store, target, Action::Start).await?,
        Cmd::Next(target) => turn(&config, &store, target, Action::NextTurn).await?,
        Cmd::Prev(target) => turn(&config, &store, target, Action::PreviousTurn).await?,
        Cmd::End(target) => turn(&config, &store, target, Action::End).await?,
        Cmd::Reset(target) => turn(&config, &store, target, Action::Reset).await?,
        Cmd::RefreshPlayers(target) => {
            turn(&config, &store, target, Action::RefreshPlayers).await?
        }
        Cmd::Damage { target, combatant, amount } => {
            let mut session = open(&config, &store, &target.adventure).await?;
            let encounter = encounter_id(&session, &target.encounter)?;
            let combatant = combatant_id(&session, encounter, &combatant)?;
            session.dispatch(Action::Damage { encounter, combatant, amount }, Instant::now())?;
            finish(&mut session, &store).await?;
        }
        Cmd::Heal { target, combatant, amount } => {
            let mut session = open(&config, &store, &target.adventure).await?;
            let encounter = encounter_id(&session, &target.encounter)?;
            let combatant = combatant_id(&session, encounter, &combatant)?;
            session.dispatch(Action::Heal { encounter, combatant, amount }, Instant::now())?;
            finish(&mut session, &store).await?;
        }
        Cmd::Loot(target) => {
            let mut session = open(&config, &store, &target.adventure).await?;
            let id = encounter_id(&session, &target.encounter)?;
            session.dispatch(Action::GenerateLoot(id), Instant::now())?;
            finish(&mut session, &store).await?;
        }
        Cmd::Xp { target, json } => {
            let mut session = open(&config, &store, &target.adventure).await?;
            let id = encounter_id(&session, &target.encounter)?;
            let catalog = session.catalog();
            if let Some(enc) = session.adventure().and_then(|a| a.encounter(id)) {
                if json {
                    let report = XpReport {
                        encounter: &enc.name,
                        xp: total_xp(enc, catalog),
                        cr: display_cr(enc, catalog),
                        total_cr: total_cr(enc, catalog),
                    };
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{}", summary(enc, catalog));
                }
            }
            finish(&mut session, &store).await?;
        }
        Cmd::Roll { adv, rolls } => {
            let mode = to_mode(adv);
            let mut dice = match config.seed {
                Some(seed) => Dice::from_seed(seed),
                None => Dice::from_entropy(),
            };
            for _ in 0..rolls {
                println!("{}", dice.d20(mode));
            }
        }
    }
    Ok(())
}
