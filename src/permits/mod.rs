pub mod domain;
pub mod monitor;
pub mod notify;
pub mod router;
pub mod store;

pub use domain::{
    classify, days_left, parse_wire_date, DateFieldError, LifecycleAction, LifecycleClass, Permit,
    PermitDraft, PermitDraftError, PermitStatus, PermitWindow,
};
pub use monitor::{LifecycleMonitor, MonitorSettings, SweepSummary};
pub use notify::{AlertGateway, MessagingGateway, NotifyError};
pub use router::scaffold_router;
pub use store::{PermitStore, PermitUpdate, RestDbStore, StoreError};
