//! Plain-text rendering of published states.

use critter_countdown::CountdownSnapshot;
use critter_sync::ResourceState;
use critter_types::{
    Creature, CreatureSummary, IdentityState, InventoryItem, InventorySummary, MailItem,
    MailSummary, VorestCreature, VorestSummary,
};
use std::fmt::Write;

/// One-line description of a collection element.
pub trait ItemLine {
    fn line(&self) -> String;
}

/// One-line description of a collection summary.
pub trait SummaryLine {
    fn line(&self) -> String;
}

impl ItemLine for Creature {
    fn line(&self) -> String {
        let status = if self.is_alive { "alive" } else { "deceased" };
        let mut line = format!("{} ({}, lvl {}, {})", self.name, self.species, self.level, status);
        if let Some(ends) = self.breeding_ends_at {
            let _ = write!(line, " breeding until {}", ends.format("%Y-%m-%d %H:%M"));
        }
        line
    }
}

impl SummaryLine for CreatureSummary {
    fn line(&self) -> String {
        format!("{} creatures, {} alive, {} deceased", self.total, self.alive, self.deceased)
    }
}

impl ItemLine for InventoryItem {
    fn line(&self) -> String {
        format!("{} x{} [{}]", self.name, self.quantity, self.item_type)
    }
}

impl SummaryLine for InventorySummary {
    fn line(&self) -> String {
        format!("{} items of {} types", self.total_items, self.distinct_types)
    }
}

impl ItemLine for MailItem {
    fn line(&self) -> String {
        let marker = if self.is_read { ' ' } else { '*' };
        let reward = match (self.has_reward, self.is_claimed) {
            (true, false) => " [reward]",
            (true, true) => " [claimed]",
            _ => "",
        };
        format!(
            "{marker} {} from {}{reward} ({})",
            self.subject,
            self.sender.as_deref().unwrap_or("system"),
            self.id
        )
    }
}

impl SummaryLine for MailSummary {
    fn line(&self) -> String {
        format!("{} unread, {} unclaimed", self.unread, self.unclaimed)
    }
}

impl ItemLine for VorestCreature {
    fn line(&self) -> String {
        format!(
            "{} ({}) arrived {}",
            self.name,
            self.species,
            self.arrived_at.format("%Y-%m-%d")
        )
    }
}

impl SummaryLine for VorestSummary {
    fn line(&self) -> String {
        format!("{} in the Vorest, {} alive", self.total, self.alive)
    }
}

/// Renders one resource snapshot as a block of lines.
pub fn render_state<T: ItemLine, S: SummaryLine>(name: &str, state: &ResourceState<T, S>) -> String {
    let mut out = String::new();

    let status = if state.is_loading {
        "loading"
    } else if state.is_refreshing {
        "refreshing"
    } else {
        "idle"
    };
    let _ = write!(out, "== {name} [{status}]");
    if let Some(at) = state.last_updated {
        let _ = write!(out, " updated {}", at.format("%H:%M:%S"));
    }
    out.push('\n');

    if let Some(error) = &state.error {
        let _ = writeln!(out, "   error: {error}");
    }
    if let Some(summary) = &state.summary {
        let _ = writeln!(out, "   {}", summary.line());
    }
    for item in &state.items {
        let _ = writeln!(out, " - {}", item.line());
    }
    if state.has_loaded() && state.items.is_empty() {
        out.push_str("   (empty)\n");
    }
    if let Some(p) = state.pagination {
        let _ = writeln!(
            out,
            "   page {}/{} ({} items, {} per page)",
            p.page, p.total_pages, p.total_items, p.page_size
        );
    }
    out
}

pub fn render_identity(state: &IdentityState) -> String {
    match state {
        IdentityState::Pending => "identity: resolving".to_string(),
        IdentityState::Resolved { profile, .. } => {
            let name = if profile.display_name.is_empty() {
                "(unnamed)"
            } else {
                profile.display_name.as_str()
            };
            let mut line = format!(
                "{name}: {} points, {} coins",
                profile.points, profile.coins
            );
            if let Some(status) = &profile.status {
                let _ = write!(line, " [{status}]");
            }
            line
        }
        IdentityState::Unlinked { reason } => format!("not linked: {reason}"),
        IdentityState::Failed { error } => format!("identity failed: {error}"),
    }
}

pub fn render_countdown(code: &str, snapshot: &CountdownSnapshot) -> String {
    if snapshot.is_complete {
        format!("{code} expired, renewing")
    } else {
        format!("{code} expires in {snapshot}")
    }
}
