//! Text renderings of the arrangement for the console.
//!
//! Views only read from the store and call its public operations; they hold no
//! arrangement state of their own.

use log::warn;
use std::fmt::Write as _;
use tourney_lineup::arrangement::ordering::compare_names;
use tourney_lineup::arrangement::{
    ArrangementStore, AssignableItem, ContentItem, ItemKind, MutationOutcome, RequestOutcome,
    Section,
};
use tourney_lineup::gateway::ArrangementGateway;
use tourney_lineup::transfer::{ItemTransfer, TransferError};

/// Toolbar reference printed by `help`
pub const TOOLBAR_HELP: &str = "\
Scope:
  load                         Fetch the arrangement for the current scope
  catalog                      Fetch content names for the current scope
  competition ID               Switch competition (clears the arrangement)
  type quyen|music             Switch content type (clears the arrangement)

Placement:
  add SECTION ITEM             Move a pool item into a section
  drop SECTION PAYLOAD         Drop a drag payload onto a section
  remove SECTION ITEM          Send an item back to the pool
  up|down SECTION ITEM         Move an item one slot
  card ITEM                    Show an item card and its drag payload

Bulk:
  shuffle SECTION              Random order
  seed SECTION                 Alphabetical order
  auto SECTION N               Place up to N matching pool items
  randomize [keep] [FILTERS]   Server-side allocation; 'keep' uses registration order
  reset                        Send every placed item back to the pool

Output:
  show                         Print pool and sections
  pool [FILTERS]               Print the pool
  save                         Save section order
  export [PATH]                Write the order file
  help | quit

FILTERS: gender=male|female|mixed form=LABEL
";

/// One-line rendering of an item
pub fn item_card(item: &AssignableItem) -> String {
    let mut line = match item.order_index {
        Some(index) => format!("{:>3}. ", index),
        None => "   - ".to_string(),
    };

    let _ = write!(line, "{} [{}] {} ({})", item.name, item.id, item.kind, item.gender);
    if !item.student_code.is_empty() {
        let _ = write!(line, " #{}", item.student_code);
    }
    if let Some(form) = &item.form_label {
        let _ = write!(line, " <{}>", form);
    }
    if item.kind == ItemKind::Team {
        let _ = write!(line, " {} member(s)", item.members.len());
    }
    line
}

/// Drag payload an item card puts on the transfer channel
pub fn drag_payload(item: &AssignableItem) -> Result<String, TransferError> {
    ItemTransfer::from_item(item).encode()
}

/// Pool items sorted by name for display
pub fn pool_list(items: &[AssignableItem]) -> String {
    if items.is_empty() {
        return "Pool is empty\n".to_string();
    }

    let mut sorted: Vec<&AssignableItem> = items.iter().collect();
    sorted.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));

    let mut out = format!("Pool ({}):\n", items.len());
    for item in sorted {
        let _ = writeln!(out, "{}  -> {}", item_card(item), item.content_id);
    }
    out
}

/// Every section with its running order; catalog names win over section names
pub fn section_list(sections: &[Section], catalog: &[ContentItem]) -> String {
    if sections.is_empty() {
        return "No sections loaded\n".to_string();
    }

    let mut out = String::new();
    for section in sections {
        let label = catalog
            .iter()
            .find(|content| content.id == section.content_id)
            .map(|content| content.name.as_str())
            .unwrap_or(section.name.as_str());
        let _ = writeln!(
            out,
            "== {} [{}] ({}) ==",
            label,
            section.content_id,
            section.len()
        );
        for item in &section.items {
            let _ = writeln!(out, "{}", item_card(item));
        }
    }
    out
}

/// Drop target: decode the payload and hand the item to the store
///
/// A payload that does not decode never reaches the store.
pub fn drop_on_section<G: ArrangementGateway + ?Sized>(
    store: &ArrangementStore<G>,
    section_id: &str,
    payload: &str,
) -> Result<MutationOutcome, TransferError> {
    let transfer = ItemTransfer::decode(payload).map_err(|err| {
        warn!("Rejected drop onto section {}: {}", section_id, err);
        err
    })?;
    Ok(store.add_to_section(section_id, transfer.into_item()))
}

/// Status line for a local mutation
pub fn mutation_line(outcome: &MutationOutcome) -> String {
    match outcome {
        MutationOutcome::Applied => "OK".to_string(),
        MutationOutcome::Ignored(reason) => format!("Nothing changed: {}", reason),
    }
}

/// Status line for a gateway-backed operation
pub fn request_line(operation: &str, outcome: &RequestOutcome) -> String {
    match outcome {
        RequestOutcome::Applied => format!("{} done", operation),
        RequestOutcome::Stale => format!("{} superseded by a newer request", operation),
        RequestOutcome::Failed(message) => format!("Error: {}", message),
    }
}
