use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use medtrack_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medication and supplement tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog medications
    Catalog {
        /// Filter by name or category
        #[arg(long)]
        search: Option<String>,
    },

    /// Add a medication from the catalog
    Add {
        /// Catalog id (see `medtrack catalog`)
        medication_id: String,

        /// Dosage; defaults to the first common dosage
        #[arg(long)]
        dosage: Option<String>,

        /// once, twice, thrice or as_needed
        #[arg(long, default_value = "once")]
        frequency: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a medication by id
    Remove { id: String },

    /// Change dosage, frequency or notes of a medication
    Update {
        id: String,

        #[arg(long)]
        dosage: Option<String>,

        #[arg(long)]
        frequency: Option<String>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        #[arg(long)]
        clear_notes: bool,
    },

    /// List your medications (default)
    List,

    /// Show today's schedule
    Schedule,

    /// Show interactions between your medications
    Interactions,

    /// Show the profile, or replace it when any field is given
    Profile(ProfileArgs),

    /// Toggle whether a dose was taken
    Taken {
        /// User medication id
        medication_id: String,

        /// morning, afternoon, evening or night
        slot: String,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Manage reminders
    Remind {
        #[command(subcommand)]
        action: RemindAction,
    },

    /// Dashboard counts and the next doses
    Summary,

    /// Delete all stored data
    Clear,
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    age: Option<String>,

    #[arg(long)]
    weight: Option<String>,

    /// Repeat for several conditions
    #[arg(long = "condition")]
    conditions: Vec<String>,

    /// Repeat for several allergies
    #[arg(long = "allergy")]
    allergies: Vec<String>,

    #[arg(long)]
    pregnant: bool,

    #[arg(long)]
    breastfeeding: bool,
}

impl ProfileArgs {
    fn has_fields(&self) -> bool {
        self.name.is_some()
            || self.age.is_some()
            || self.weight.is_some()
            || !self.conditions.is_empty()
            || !self.allergies.is_empty()
            || self.pregnant
            || self.breastfeeding
    }

    fn into_profile(self) -> UserProfile {
        UserProfile {
            name: self.name.unwrap_or_default(),
            age: self.age.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            conditions: self.conditions,
            allergies: self.allergies,
            is_pregnant: self.pregnant,
            is_breastfeeding: self.breastfeeding,
        }
    }
}

#[derive(Subcommand)]
enum RemindAction {
    /// Add a reminder
    Add {
        label: String,

        #[arg(long)]
        slot: String,

        /// Attach to a user medication id
        #[arg(long)]
        medication: Option<String>,
    },

    /// Remove a reminder by id
    Remove { id: Uuid },

    /// List reminders
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    logging::init_with_level(&config.logging.level);

    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    let catalog = default_catalog();
    let mut errors = catalog.validate();
    errors.extend(default_rules().validate(catalog));
    if !errors.is_empty() {
        eprintln!("Reference data validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid reference data".into()));
    }

    let state_path = config.state_path();
    tracing::debug!("Using state file {:?}", state_path);
    let mut store = AppStateStore::open(JsonFileStore::new(state_path))?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::Catalog { search } => cmd_catalog(catalog, search.as_deref()),
        Commands::Add {
            medication_id,
            dosage,
            frequency,
            notes,
        } => cmd_add(&mut store, &medication_id, dosage, &frequency, notes)?,
        Commands::Remove { id } => cmd_remove(&mut store, &id)?,
        Commands::Update {
            id,
            dosage,
            frequency,
            notes,
            clear_notes,
        } => cmd_update(&mut store, &id, dosage, frequency, notes, clear_notes)?,
        Commands::List => print_medications(store.snapshot()),
        Commands::Schedule => print_schedule(store.snapshot()),
        Commands::Interactions => print_interactions(store.snapshot()),
        Commands::Profile(args) => cmd_profile(&mut store, args)?,
        Commands::Taken {
            medication_id,
            slot,
            date,
        } => cmd_taken(&mut store, &medication_id, &slot, date)?,
        Commands::Remind { action } => cmd_remind(&mut store, action)?,
        Commands::Summary => print_summary(store.snapshot()),
        Commands::Clear => {
            store.clear_all_data()?;
            println!("✓ All data cleared");
        }
    }

    Ok(())
}

fn cmd_catalog(catalog: &MedicationCatalog, search: Option<&str>) {
    let results = catalog.search(search.unwrap_or(""));
    if results.is_empty() {
        println!("No catalog medications match.");
        return;
    }

    for def in results {
        let kind = match def.kind {
            MedicationKind::Prescription => " [prescription]",
            MedicationKind::Supplement => "",
        };
        println!("{:<20} {} ({}){}", def.id, def.name, def.category, kind);
        println!("{:<20} dosages: {}", "", def.common_dosages.join(", "));
    }
}

fn cmd_add(
    store: &mut AppStateStore<'_>,
    medication_id: &str,
    dosage: Option<String>,
    frequency: &str,
    notes: Option<String>,
) -> Result<()> {
    let Some(definition) = store.catalog().get(medication_id) else {
        return Err(Error::Other(format!(
            "Unknown medication '{}'. Run `medtrack catalog` to see available ids.",
            medication_id
        )));
    };

    let dosage = match dosage.or_else(|| definition.common_dosages.first().cloned()) {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Err(Error::Other("A dosage is required".into())),
    };
    let frequency: Frequency = frequency.parse()?;
    let name = definition.name.clone();

    let medication = UserMedication::new(medication_id, dosage, frequency, notes, Utc::now());
    let id = medication.id.clone();
    let snapshot = store.add_medication(medication)?;

    println!("✓ Added {} ({})", name, id);
    warn_new_interactions(snapshot, &name);
    Ok(())
}

fn warn_new_interactions(snapshot: &StoreSnapshot, name: &str) {
    for interaction in &snapshot.interactions {
        if interaction.med1_name == name || interaction.med2_name == name {
            println!(
                "  ⚠ {} interaction: {} + {}",
                interaction.rule.severity, interaction.med1_name, interaction.med2_name
            );
        }
    }
}

fn cmd_remove(store: &mut AppStateStore<'_>, id: &str) -> Result<()> {
    let existed = store.snapshot().medication(id).is_some();
    store.remove_medication(id)?;
    if existed {
        println!("✓ Removed {}", id);
    } else {
        println!("No medication with id {}", id);
    }
    Ok(())
}

fn cmd_update(
    store: &mut AppStateStore<'_>,
    id: &str,
    dosage: Option<String>,
    frequency: Option<String>,
    notes: Option<String>,
    clear_notes: bool,
) -> Result<()> {
    let patch = MedicationPatch {
        dosage,
        frequency: frequency.map(|f| f.parse::<Frequency>()).transpose()?,
        notes: if clear_notes { Some(None) } else { notes.map(Some) },
    };

    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    if store.snapshot().medication(id).is_none() {
        println!("No medication with id {}", id);
        return Ok(());
    }

    store.update_medication(id, &patch)?;
    println!("✓ Updated {}", id);
    Ok(())
}

fn cmd_profile(store: &mut AppStateStore<'_>, args: ProfileArgs) -> Result<()> {
    if args.has_fields() {
        store.set_user_profile(args.into_profile())?;
        println!("✓ Profile saved");
    }
    print_profile(&store.snapshot().user_profile);
    Ok(())
}

fn cmd_taken(
    store: &mut AppStateStore<'_>,
    medication_id: &str,
    slot: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    let slot: TimeSlot = slot.parse()?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let snapshot = store.toggle_medication_taken(medication_id, slot, date)?;
    let state = if snapshot.is_taken(medication_id, slot, date) {
        "taken"
    } else {
        "not taken"
    };
    println!("✓ {} {} on {}: {}", medication_id, slot, date, state);
    Ok(())
}

fn cmd_remind(store: &mut AppStateStore<'_>, action: RemindAction) -> Result<()> {
    match action {
        RemindAction::Add {
            label,
            slot,
            medication,
        } => {
            let reminder = Reminder::new(label, slot.parse::<TimeSlot>()?, medication);
            let id = reminder.id;
            store.add_reminder(reminder)?;
            println!("✓ Reminder added ({})", id);
        }
        RemindAction::Remove { id } => {
            if store.snapshot().reminders.iter().any(|r| r.id == id) {
                store.remove_reminder(id)?;
                println!("✓ Reminder removed");
            } else {
                println!("No reminder with id {}", id);
            }
        }
        RemindAction::List => {
            let reminders = &store.snapshot().reminders;
            if reminders.is_empty() {
                println!("No reminders.");
            }
            for reminder in reminders {
                println!(
                    "{}  {:<9} {}{}",
                    reminder.id,
                    reminder.time_slot,
                    reminder.label,
                    reminder
                        .medication_id
                        .as_deref()
                        .map(|m| format!(" ({})", m))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn print_medications(snapshot: &StoreSnapshot) {
    if snapshot.medications.is_empty() {
        println!("No medications yet. Add one with `medtrack add <id>`.");
        return;
    }

    for med in &snapshot.medications {
        let name = default_catalog()
            .get(&med.medication_id)
            .map(|d| d.name.as_str())
            .unwrap_or(&med.medication_id);
        println!("{}", med.id);
        println!("  {} {} - {}", name, med.dosage, med.frequency.label());
        if let Some(ref notes) = med.notes {
            println!("  Notes: {}", notes);
        }
        println!("  Added {}", med.added_date.with_timezone(&Local).date_naive());
    }
}

fn print_schedule(snapshot: &StoreSnapshot) {
    if snapshot.medications.is_empty() {
        println!("No schedule yet.");
        return;
    }

    for (slot, entries) in snapshot.schedule.iter() {
        println!("{} ({})", capitalize(slot.as_str()), slot.clock_label());
        if entries.is_empty() {
            println!("  No medications scheduled for this time");
        }
        for entry in entries {
            let name = entry
                .info
                .as_ref()
                .map(|i| i.name.as_str())
                .unwrap_or(&entry.medication.medication_id);
            let food = if entry.with_food {
                "take with food"
            } else {
                "can take on empty stomach"
            };
            println!("  • {} {} ({})", name, entry.medication.dosage, food);
        }
    }
}

fn print_interactions(snapshot: &StoreSnapshot) {
    if snapshot.interactions.is_empty() {
        println!(
            "No known interactions between your medications ({} total).",
            snapshot.medications.len()
        );
        return;
    }

    for interaction in &snapshot.interactions {
        let rule = &interaction.rule;
        println!(
            "[{}] {} + {} ({})",
            rule.severity, interaction.med1_name, interaction.med2_name, rule.interaction_type
        );
        println!("  {}", rule.description);
        println!("  → {}", rule.recommendation);
        if !rule.sources.is_empty() {
            println!("  Sources: {}", rule.sources.join(", "));
        }
    }
}

fn print_profile(profile: &UserProfile) {
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    println!("Name:          {}", or_dash(&profile.name));
    println!("Age:           {}", or_dash(&profile.age));
    println!("Weight:        {}", or_dash(&profile.weight));
    println!("Conditions:    {}", or_dash(&profile.conditions.join(", ")));
    println!("Allergies:     {}", or_dash(&profile.allergies.join(", ")));
    println!("Pregnant:      {}", if profile.is_pregnant { "yes" } else { "no" });
    println!("Breastfeeding: {}", if profile.is_breastfeeding { "yes" } else { "no" });
}

fn print_summary(snapshot: &StoreSnapshot) {
    let summary = DashboardSummary::from_snapshot(snapshot);
    let today = Local::now().date_naive();
    let progress = daily_progress(snapshot, today);

    println!("Medications:     {}", summary.medication_count);
    println!("Doses per day:   {}", summary.scheduled_doses);
    println!("Interactions:    {}", summary.interaction_count);
    if let Some(severity) = summary.highest_severity {
        println!("Highest severity: {}", severity);
    }
    println!("Taken today:     {}/{}", progress.taken, progress.scheduled);

    let upcoming = upcoming_doses(&snapshot.schedule, 3);
    if !upcoming.is_empty() {
        println!();
        println!("Upcoming doses:");
        for dose in upcoming {
            let name = dose
                .entry
                .info
                .as_ref()
                .map(|i| i.name.as_str())
                .unwrap_or(&dose.entry.medication.medication_id);
            println!("  {:<9} {} {}", dose.entry.time, name, dose.entry.medication.dosage);
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
