mod activity_detail;
mod activity_list;

use crate::funds::FundsClient;
use crate::screen::ActivitiesScreen;

pub use activity_detail::ActivityDetailView;
pub use activity_list::ActivityListView;

/// The activities screen as wired to the live API
pub type ConsoleScreen = ActivitiesScreen<FundsClient, FundsClient>;
