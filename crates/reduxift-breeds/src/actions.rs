//! Actions of the breeds demo

use reduxift::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Load the breed list (async effect)
    Fetch,
    /// Replace the breed list
    Reload,
    /// Show a message
    Alert,
    /// Dismiss the message
    ClearAlert,
    /// Start a random dog request (sync effect that starts the stream)
    FetchDog,
    /// Stream of dog pictures for one breed
    DogStream,
    /// A dog request is in flight
    RequestDog,
    /// One dog picture arrived
    ReceiveDog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Breeds(Vec<String>),
    Message(String),
    Breed(Option<String>),
    ImageUrl(String),
}

pub type BreedsAction = Action<Kind, Value>;

pub fn reload(breeds: Vec<String>) -> BreedsAction {
    Action::with_value(Kind::Reload, Value::Breeds(breeds))
}

pub fn alert(message: impl Into<String>) -> BreedsAction {
    Action::with_value(Kind::Alert, Value::Message(message.into()))
}

pub fn clear_alert() -> BreedsAction {
    Action::new(Kind::ClearAlert)
}

pub fn request_dog(breed: Option<String>) -> BreedsAction {
    Action::with_value(Kind::RequestDog, Value::Breed(breed))
}

pub fn receive_dog(url: String) -> BreedsAction {
    Action::with_value(Kind::ReceiveDog, Value::ImageUrl(url))
}
