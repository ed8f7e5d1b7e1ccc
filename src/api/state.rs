use std::sync::Arc;

use crate::webhook::Reconciler;

pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
        }
    }
}
