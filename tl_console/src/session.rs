//! Console session: turns parsed commands into store calls and replies.

use crate::commands::ConsoleCommand;
use crate::views;
use std::path::PathBuf;
use tourney_lineup::arrangement::{
    ArrangementError, ArrangementStore, AssignableItem, ContentType, ItemFilters, RequestOutcome,
};
use tourney_lineup::gateway::ArrangementGateway;

/// What the console should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

/// Interactive session over one arrangement store
pub struct Session<G: ArrangementGateway + ?Sized> {
    store: ArrangementStore<G>,
}

impl<G: ArrangementGateway + ?Sized> Session<G> {
    pub fn new(store: ArrangementStore<G>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArrangementStore<G> {
        &self.store
    }

    /// Run one command; failures are reported in the reply, never returned
    pub async fn execute(&self, command: ConsoleCommand) -> Reply {
        let output = match command {
            ConsoleCommand::Load => self.load().await,
            ConsoleCommand::Catalog => self.load_catalog().await,
            ConsoleCommand::SetCompetition(id) => {
                self.store.set_competition_id(Some(id));
                self.load().await
            }
            ConsoleCommand::SetContentType(content_type) => {
                self.store.set_content_type(content_type);
                self.load().await
            }
            ConsoleCommand::Randomize { randomize, filters } => {
                let outcome = self.store.randomize(randomize, filters).await;
                views::request_line("randomize", &outcome)
            }
            ConsoleCommand::Add { section, item } => match self.find_item(&item) {
                Some(found) => views::mutation_line(&self.store.add_to_section(&section, found)),
                None => format!("Unknown item '{}'", item),
            },
            ConsoleCommand::Drop { section, payload } => {
                match views::drop_on_section(&self.store, &section, &payload) {
                    Ok(outcome) => views::mutation_line(&outcome),
                    Err(err) => format!("Drop rejected: {}", err),
                }
            }
            ConsoleCommand::Remove { section, item } => {
                views::mutation_line(&self.store.remove_from_section(&section, &item))
            }
            ConsoleCommand::Move {
                section,
                item,
                delta,
            } => views::mutation_line(&self.store.move_item_in_section(&section, &item, delta)),
            ConsoleCommand::Shuffle(section) => {
                views::mutation_line(&self.store.shuffle_section(&section))
            }
            ConsoleCommand::Seed(section) => views::mutation_line(&self.store.seed_section(&section)),
            ConsoleCommand::AutoAssign { section, count } => {
                let moved = self.store.auto_assign_from_pool(&section, count);
                format!("Placed {} item(s) in '{}'", moved, section)
            }
            ConsoleCommand::Card(item) => match self.find_item(&item) {
                Some(found) => match views::drag_payload(&found) {
                    Ok(payload) => format!("{}\n{}", views::item_card(&found), payload),
                    Err(err) => format!("Error: {}", err),
                },
                None => format!("Unknown item '{}'", item),
            },
            ConsoleCommand::ResetAll => views::mutation_line(&self.store.reset_all()),
            ConsoleCommand::Save => {
                let outcome = self.store.save().await;
                views::request_line("save", &outcome)
            }
            ConsoleCommand::Export(path) => self.export(path).await,
            ConsoleCommand::Pool(filters) => self.pool(&filters),
            ConsoleCommand::Show => self.show(),
            ConsoleCommand::Help => views::TOOLBAR_HELP.to_string(),
            ConsoleCommand::Quit => return Reply::Quit,
        };

        Reply::Output(output)
    }

    async fn load(&self) -> String {
        let scope = self.store.scope();
        let Some(competition_id) = scope.competition_id else {
            return views::request_line(
                "load",
                &RequestOutcome::Failed(ArrangementError::NoCompetition.client_message()),
            );
        };

        let outcome = self.store.load(&competition_id, scope.content_type).await;
        if outcome.is_applied() {
            // Section labels are best effort; a catalog failure does not undo the load
            let _ = self
                .store
                .load_content_catalog(&competition_id, scope.content_type)
                .await;
            return self.show();
        }
        views::request_line("load", &outcome)
    }

    async fn load_catalog(&self) -> String {
        let scope = self.store.scope();
        let Some(competition_id) = scope.competition_id else {
            return views::request_line(
                "catalog",
                &RequestOutcome::Failed(ArrangementError::NoCompetition.client_message()),
            );
        };

        let outcome = self
            .store
            .load_content_catalog(&competition_id, scope.content_type)
            .await;
        match outcome {
            RequestOutcome::Applied => {
                let catalog = self.store.content_catalog();
                let mut out = format!("{} content item(s)", catalog.len());
                for content in catalog {
                    out.push_str(&format!("\n  {} [{}]", content.name, content.id));
                }
                out
            }
            other => views::request_line("catalog", &other),
        }
    }

    /// Pool items first, then placed items
    fn find_item(&self, item_id: &str) -> Option<AssignableItem> {
        self.store
            .pool()
            .into_iter()
            .chain(self.store.sections().into_iter().flat_map(|s| s.items))
            .find(|item| item.id == item_id)
    }

    async fn export(&self, path: Option<PathBuf>) -> String {
        let snapshot = match self.store.export_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => return format!("Error: {}", err.client_message()),
        };
        let path = path.unwrap_or_else(|| PathBuf::from(&snapshot.file_name));

        match tokio::fs::write(&path, snapshot.contents.as_bytes()).await {
            Ok(()) => format!("Wrote {}", path.display()),
            Err(err) => format!("Error: could not write {}: {}", path.display(), err),
        }
    }

    fn pool(&self, filters: &ItemFilters) -> String {
        views::pool_list(&self.store.pool_filtered(filters))
    }

    fn show(&self) -> String {
        let scope = self.store.scope();
        let mut out = format!(
            "Competition: {} | {} | {} placed, {} in pool{}\n",
            scope.competition_id.as_deref().unwrap_or("-"),
            content_label(scope.content_type),
            self.store.placed_count(),
            self.store.pool().len(),
            if self.store.is_loading() {
                " | loading..."
            } else {
                ""
            }
        );
        if let Some(error) = self.store.last_error() {
            out.push_str(&format!("Error: {}\n", error));
        }
        out.push_str(&views::pool_list(&self.store.pool()));
        out.push_str(&views::section_list(
            &self.store.sections(),
            &self.store.content_catalog(),
        ));
        out
    }
}

fn content_label(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Quyen => "forms (QUYEN)",
        ContentType::Music => "music (MUSIC)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::parse_command;
    use std::sync::Arc;
    use tourney_lineup::arrangement::{Arrangement, ContentItem, Gender, Section};
    use tourney_lineup::gateway::MemoryGateway;

    fn session() -> (Arc<MemoryGateway>, Session<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::with_seed(3));
        gateway.set_arrangement(
            "cup",
            ContentType::Quyen,
            Arrangement {
                pool: vec![
                    AssignableItem::athlete("1", "Binh", Gender::Male, "c1"),
                    AssignableItem::athlete("2", "An", Gender::Female, "c1"),
                ],
                sections: vec![Section::new("c1", "Section one")],
            },
        );
        gateway.set_catalog(
            "cup",
            ContentType::Quyen,
            vec![ContentItem {
                id: "c1".to_string(),
                name: "Long Ho Quyen".to_string(),
            }],
        );
        let store = ArrangementStore::new(Arc::clone(&gateway));
        (gateway, Session::new(store))
    }

    async fn run(session: &Session<MemoryGateway>, line: &str) -> String {
        match session.execute(parse_command(line).unwrap()).await {
            Reply::Output(text) => text,
            Reply::Quit => "<quit>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_requires_competition() {
        let (gateway, session) = session();
        let out = run(&session, "load").await;
        assert_eq!(out, "Error: Select a competition first");
        assert_eq!(gateway.calls().fetch, 0);
    }

    #[tokio::test]
    async fn test_competition_loads_arrangement_and_labels() {
        let (_gateway, session) = session();
        let out = run(&session, "competition cup").await;
        assert!(out.contains("Competition: cup"));
        assert!(out.contains("== Long Ho Quyen [c1] (0) =="));
        assert_eq!(session.store().pool().len(), 2);
    }

    #[tokio::test]
    async fn test_placement_flow() {
        let (gateway, session) = session();
        run(&session, "competition cup").await;

        assert_eq!(run(&session, "add c1 1").await, "OK");
        assert_eq!(run(&session, "add c1 2").await, "OK");
        assert_eq!(run(&session, "seed c1").await, "OK");
        assert!(run(&session, "up c1 2").await.starts_with("Nothing changed"));
        assert_eq!(run(&session, "save").await, "save done");

        let saved = gateway.last_saved("cup", ContentType::Quyen).unwrap();
        let ids: Vec<&str> = saved.sections[0]
            .items
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_card_payload_can_be_dropped() {
        let (_gateway, session) = session();
        run(&session, "competition cup").await;

        let card = run(&session, "card 2").await;
        let payload = card.lines().nth(1).unwrap().to_string();
        assert_eq!(run(&session, &format!("drop c1 {}", payload)).await, "OK");
        assert!(run(&session, "drop c1 {broken").await.starts_with("Drop rejected"));
        assert_eq!(session.store().placed_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let (_gateway, session) = session();
        run(&session, "competition cup").await;
        assert_eq!(run(&session, "add c1 99").await, "Unknown item '99'");
    }

    #[tokio::test]
    async fn test_failures_are_reported_inline() {
        let (gateway, session) = session();
        run(&session, "competition cup").await;
        run(&session, "add c1 1").await;

        gateway.fail_with(503, "maintenance");
        let out = run(&session, "save").await;
        assert!(out.starts_with("Error: The server rejected the request (503)"));
        assert_eq!(session.store().placed_count(), 1);

        let out = run(&session, "show").await;
        assert!(out.contains("Error: The server rejected the request"));
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let (_gateway, session) = session();
        run(&session, "competition cup").await;
        run(&session, "auto c1 5").await;

        let path = std::env::temp_dir().join(format!("tl-console-export-{}.json", std::process::id()));
        let out = run(&session, &format!("export {}", path.display())).await;
        assert!(out.starts_with("Wrote"));

        let written = std::fs::read_to_string(&path).unwrap();
        let document: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(document["contentType"], "QUYEN");
        assert_eq!(document["sections"][0]["items"].as_array().unwrap().len(), 2);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_quit() {
        let (_gateway, session) = session();
        assert_eq!(session.execute(ConsoleCommand::Quit).await, Reply::Quit);
    }
}
