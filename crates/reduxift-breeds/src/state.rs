use std::sync::Arc;

/// Root state of the demo; each region is reduced on its own and shared
/// between snapshots when untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreedsState {
    pub breeds: Arc<Vec<String>>,
    pub alert: Arc<String>,
    pub dog: Arc<DogState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DogState {
    pub image_url: String,
    pub fetching: bool,
    pub received: usize,
}
