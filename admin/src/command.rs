/// Every action reachable from an admin button. Action ids are the strings
/// carried by the buttons; [`AdminCommand::parse`] and
/// [`AdminCommand::action_id`] are inverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Menu,
    Stats,
    Purchases,
    /// Category picker: pending or processed.
    Activations,
    ActivationsDetail,
    Export,
    ExportActivation(i64),
    MarkProcessedList,
    Mark(i64),
    CredentialsList,
    AddCredentials(i64),
    EditCredentials(i64),
    PendingPage(usize),
    ProcessedPage(usize),
    ViewActivation(i64),
    ToggleStatus(i64),
    DeleteConfirm(i64),
    DeleteActivation(i64),
    DeletePurchase(i64),
    Search,
    SearchBack,
    Exit,
}

const FIXED: &[(&str, AdminCommand)] = &[
    ("admin_menu", AdminCommand::Menu),
    ("admin_stats", AdminCommand::Stats),
    ("admin_purchases", AdminCommand::Purchases),
    ("admin_activations", AdminCommand::Activations),
    ("admin_activations_detail", AdminCommand::ActivationsDetail),
    ("admin_export", AdminCommand::Export),
    ("admin_mark_processed", AdminCommand::MarkProcessedList),
    ("admin_add_credentials", AdminCommand::CredentialsList),
    ("admin_search", AdminCommand::Search),
    ("admin_search_back", AdminCommand::SearchBack),
    ("admin_exit", AdminCommand::Exit),
];

const PENDING_PAGE: &str = "admin_activations_pending_page_";
const PROCESSED_PAGE: &str = "admin_activations_processed_page_";
const EXPORT_ACTIVATION: &str = "export_activation_";
const MARK: &str = "mark_";
const ADD_CREDENTIALS: &str = "add_cred_";
const EDIT_CREDENTIALS: &str = "edit_cred_";
const VIEW_ACTIVATION: &str = "view_activation_";
const TOGGLE_STATUS: &str = "toggle_status_";
const DELETE_CONFIRM: &str = "delete_confirm_";
const DELETE_ACTIVATION: &str = "delete_yes_";
const DELETE_PURCHASE: &str = "delete_purchase_";

impl AdminCommand {
    pub fn parse(action_id: &str) -> Option<Self> {
        if let Some((_, command)) = FIXED.iter().find(|(id, _)| *id == action_id) {
            return Some(*command);
        }

        let ids: [(&str, fn(i64) -> AdminCommand); 9] = [
            (EXPORT_ACTIVATION, AdminCommand::ExportActivation),
            (MARK, AdminCommand::Mark),
            (ADD_CREDENTIALS, AdminCommand::AddCredentials),
            (EDIT_CREDENTIALS, AdminCommand::EditCredentials),
            (VIEW_ACTIVATION, AdminCommand::ViewActivation),
            (TOGGLE_STATUS, AdminCommand::ToggleStatus),
            (DELETE_CONFIRM, AdminCommand::DeleteConfirm),
            (DELETE_ACTIVATION, AdminCommand::DeleteActivation),
            (DELETE_PURCHASE, AdminCommand::DeletePurchase),
        ];
        for (prefix, build) in ids {
            if let Some(id) = action_id.strip_prefix(prefix) {
                return parse_number(id).map(build);
            }
        }

        if let Some(page) = action_id.strip_prefix(PENDING_PAGE) {
            return parse_number(page).map(AdminCommand::PendingPage);
        }
        if let Some(page) = action_id.strip_prefix(PROCESSED_PAGE) {
            return parse_number(page).map(AdminCommand::ProcessedPage);
        }
        None
    }

    pub fn action_id(&self) -> String {
        match self {
            AdminCommand::Menu => "admin_menu".into(),
            AdminCommand::Stats => "admin_stats".into(),
            AdminCommand::Purchases => "admin_purchases".into(),
            AdminCommand::Activations => "admin_activations".into(),
            AdminCommand::ActivationsDetail => "admin_activations_detail".into(),
            AdminCommand::Export => "admin_export".into(),
            AdminCommand::ExportActivation(id) => format!("{EXPORT_ACTIVATION}{id}"),
            AdminCommand::MarkProcessedList => "admin_mark_processed".into(),
            AdminCommand::Mark(id) => format!("{MARK}{id}"),
            AdminCommand::CredentialsList => "admin_add_credentials".into(),
            AdminCommand::AddCredentials(id) => format!("{ADD_CREDENTIALS}{id}"),
            AdminCommand::EditCredentials(id) => format!("{EDIT_CREDENTIALS}{id}"),
            AdminCommand::PendingPage(page) => format!("{PENDING_PAGE}{page}"),
            AdminCommand::ProcessedPage(page) => format!("{PROCESSED_PAGE}{page}"),
            AdminCommand::ViewActivation(id) => format!("{VIEW_ACTIVATION}{id}"),
            AdminCommand::ToggleStatus(id) => format!("{TOGGLE_STATUS}{id}"),
            AdminCommand::DeleteConfirm(id) => format!("{DELETE_CONFIRM}{id}"),
            AdminCommand::DeleteActivation(id) => format!("{DELETE_ACTIVATION}{id}"),
            AdminCommand::DeletePurchase(id) => format!("{DELETE_PURCHASE}{id}"),
            AdminCommand::Search => "admin_search".into(),
            AdminCommand::SearchBack => "admin_search_back".into(),
            AdminCommand::Exit => "admin_exit".into(),
        }
    }
}

/// Digits only, so `mark_+1` or `mark_ 1` never resolve.
fn parse_number<T: std::str::FromStr>(digits: &str) -> Option<T> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
