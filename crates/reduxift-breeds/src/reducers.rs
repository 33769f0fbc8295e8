//! Reducers of the breeds demo
//!
//! The root reducer composes one child per state region.

use crate::actions::{BreedsAction, Kind, Value};
use crate::state::{BreedsState, DogState};
use reduxift::reduce_region;

pub fn reduce(state: &BreedsState, action: &BreedsAction) -> BreedsState {
    BreedsState {
        breeds: reduce_region(&state.breeds, action, breeds),
        alert: reduce_region(&state.alert, action, alert),
        dog: reduce_region(&state.dog, action, dog),
    }
}

fn breeds(state: &Vec<String>, action: &BreedsAction) -> Vec<String> {
    match (action.kind(), action.value()) {
        (Kind::Reload, Some(Value::Breeds(breeds))) => breeds.clone(),
        _ => state.clone(),
    }
}

fn alert(state: &String, action: &BreedsAction) -> String {
    match (action.kind(), action.value()) {
        (Kind::Alert, Some(Value::Message(message))) => message.clone(),
        (Kind::ClearAlert, _) => String::new(),
        _ => state.clone(),
    }
}

fn dog(state: &DogState, action: &BreedsAction) -> DogState {
    match (action.kind(), action.value()) {
        (Kind::RequestDog, _) => DogState {
            fetching: true,
            received: 0,
            ..state.clone()
        },
        (Kind::ReceiveDog, Some(Value::ImageUrl(url))) => DogState {
            image_url: url.clone(),
            fetching: false,
            received: state.received + 1,
        },
        (Kind::Alert, _) => DogState {
            fetching: false,
            ..state.clone()
        },
        _ => state.clone(),
    }
}
