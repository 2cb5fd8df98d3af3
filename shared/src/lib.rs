pub mod models {
    pub mod auth;
    pub mod status;
    pub mod ticket;
    pub mod team;
    pub mod registration;
    pub mod refund;
}

pub mod dto {
    pub mod common;
    pub mod lenient;
    pub mod ticket;
    pub mod team;
    pub mod registration;
    pub mod refund;
}

pub mod error;
pub mod filter;
pub mod query;
pub mod reducer;
pub mod resource;
pub mod season;

// Re-export commonly used items
pub use error::{ClientError, ErrorBody, Result};
pub use filter::{DateRange, FilterPatch, FilterState, FilterValue, Merge};
pub use query::{build_query, ListQuery, SortOrder};
pub use reducer::{reduce, ListPage, PaginationState, StatsScope, StatsSummary};
pub use resource::{ListResource, ListRow, RowAction};
pub use season::{Season, SeasonTag};

// Re-export models
pub use models::{
    auth::Role,
    status::RowStatus,
    ticket::{TicketRow, Tickets},
    team::{TeamRow, Teams},
    registration::{RegistrationRow, Registrations},
    refund::{RefundRow, Refunds},
};

// Re-export DTOs
pub use dto::{
    common::{ListEnvelope, MutationResponse, PaginationDto, StatsDto},
    ticket::{TicketRecord, TicketUpdateForm},
    team::{TeamForm, TeamRecord},
    registration::RegistrationRecord,
    refund::{RefundDecision, RefundDecisionForm, RefundRecord},
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resource_paths() {
        assert_eq!(Tickets::PATH, "/api/admin/tickets");
        assert_eq!(Teams::export_path(), "/api/admin/teams/export");
        assert_eq!(Registrations::COLLECTION, "registrations");
        assert_eq!(Refunds::item_path("r 1"), "/api/admin/refunds/r%201");
    }

    #[test]
    fn test_admin_sees_every_ticket_action() {
        assert_eq!(Tickets::actions_for(Role::Admin), Tickets::ACTIONS.to_vec());
    }
}
