use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{by_name, ensure_note_types, ModelData};
use crate::note::TwNote;
use crate::settings::Settings;
use crate::store::{Collection, NoteModel, StoredNote};

/// What a sync did, one count per note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    /// Stored under another note type and moved over. Not also counted as updated.
    pub migrated: usize,
    pub unchanged: usize,
    pub removed: usize,
}

fn collection_model(col: &dyn Collection, model: &ModelData) -> Result<NoteModel> {
    col.model_by_name(model.name)?
        .ok_or_else(|| Error::UnknownModel(model.name.to_string()))
}

/// Bring the collection in line with the notes found in the wiki.
pub fn sync_notes(
    notes: impl IntoIterator<Item = TwNote>,
    col: &mut dyn Collection,
    settings: &Settings,
) -> Result<SyncReport> {
    ensure_note_types(col)?;

    let mut notes: Vec<TwNote> = notes.into_iter().collect();
    notes.sort_by(|a, b| a.id.cmp(&b.id));
    if let Some(base) = &settings.base_url {
        for note in &mut notes {
            note.set_permalink(base);
        }
    }

    // Only notes of our own types are ours to touch.
    let stored: Vec<StoredNote> = col
        .notes()?
        .into_iter()
        .filter(|n| by_name(&n.model).is_some())
        .collect();
    let mut by_id: HashMap<String, StoredNote> = HashMap::new();
    for note in &stored {
        match note.field("ID") {
            Some(id) if !id.is_empty() => {
                by_id.insert(id.to_string(), note.clone());
            }
            _ => {}
        }
    }

    let mut report = SyncReport::default();
    for note in &notes {
        match by_id.remove(&note.id) {
            None => {
                add_note(note, col, settings)?;
                report.added += 1;
            }
            Some(mut existing) => {
                let migrated = migrate(note, &mut existing, col)?;
                let mut changed = migrated;

                if !note.fields_equal(&existing, col)? {
                    note.update_fields(&mut existing, col)?;
                    changed = true;
                }
                if let Some(deck) = &note.target_deck {
                    if *deck != existing.deck {
                        debug!("Moving {} from {:?} to {:?}", note.id, existing.deck, deck);
                        existing.deck = deck.clone();
                        changed = true;
                    }
                }

                if changed {
                    col.save_note(&existing)?;
                }
                if migrated {
                    report.migrated += 1;
                } else if changed {
                    debug!("Updated {}", note.id);
                    report.updated += 1;
                } else {
                    report.unchanged += 1;
                }
            }
        }
    }

    if settings.remove_orphans {
        let wanted: HashSet<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        let orphans: Vec<i64> = stored
            .iter()
            .filter(|n| !n.field("ID").is_some_and(|id| wanted.contains(id)))
            .map(|n| n.note_id)
            .collect();
        if !orphans.is_empty() {
            col.remove_notes(&orphans)?;
            info!("Removed {} notes no longer in the wiki", orphans.len());
        }
        report.removed = orphans.len();
    }

    info!(
        "Sync done: {} added, {} updated, {} migrated, {} unchanged, {} removed",
        report.added, report.updated, report.migrated, report.unchanged, report.removed
    );
    Ok(report)
}

fn add_note(note: &TwNote, col: &mut dyn Collection, settings: &Settings) -> Result<()> {
    let model = collection_model(col, note.model())?;
    let deck = note.target_deck.as_deref().unwrap_or(&settings.default_deck);

    let mut stored = StoredNote::new(&model, deck);
    stored.set_field("Wiki", &settings.wiki_name);
    note.update_fields(&mut stored, col)?;
    col.add_note(&mut stored)?;
    debug!("Added {} as note {}", note.id, stored.note_id);
    Ok(())
}

/// Move `existing` onto the note's type if it is stored as another one.
fn migrate(note: &TwNote, existing: &mut StoredNote, col: &dyn Collection) -> Result<bool> {
    let to = note.model();
    if existing.model == to.name {
        return Ok(false);
    }
    let from = by_name(&existing.model).ok_or_else(|| Error::UnknownModel(existing.model.clone()))?;
    existing.change_model(&collection_model(col, to)?, &from.field_remap(to));
    info!("Migrated {} from {:?} to {:?}", note.id, from.name, to.name);
    Ok(true)
}
