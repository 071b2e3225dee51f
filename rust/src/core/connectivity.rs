use crate::state::ViewState;

/// Unknown connectivity (`None`) counts as offline.
pub(crate) fn normalize_report(is_connected: Option<bool>) -> bool {
    is_connected.unwrap_or(false)
}

/// The offline overlay sits on top of the surface only once content is showing; the
/// surface itself stays mounted so reconnecting does not reload the page.
pub fn offline_overlay_visible(view: ViewState, is_connected: bool) -> bool {
    view == ViewState::Content && !is_connected
}
