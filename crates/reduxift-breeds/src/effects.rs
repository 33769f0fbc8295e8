//! Effects of the breeds demo
//!
//! The catalogue simulates a remote dog API: every request waits for the
//! configured delay and answers from the configured breed list.

use crate::actions::{self, BreedsAction, Kind};
use crate::config::BreedsConfig;
use futures::stream::{self, BoxStream, StreamExt};
use reduxift::action::StreamEffect;
use reduxift::{Action, Canceller, EffectError};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct Catalogue {
    breeds: Arc<Vec<String>>,
    delay: Duration,
    dog_count: usize,
    runtime: Handle,
}

impl Catalogue {
    pub fn new(config: &BreedsConfig, runtime: Handle) -> Self {
        Self {
            breeds: Arc::new(config.breeds.clone()),
            delay: config.fetch_delay(),
            dog_count: config.dog_count,
            runtime,
        }
    }

    /// Load the breed list in the background.
    pub fn fetch_breeds(&self) -> BreedsAction {
        let catalogue = self.clone();
        Action::async_effect(Kind::Fetch, move |dispatch| {
            let breeds = Arc::clone(&catalogue.breeds);
            let delay = catalogue.delay;

            let task = catalogue.runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                if breeds.is_empty() {
                    dispatch.dispatch(actions::alert("no breeds available"));
                } else {
                    dispatch.dispatch(actions::reload(breeds.to_vec()));
                }
            });

            let canceller = Canceller::from_task(&task);
            canceller.on_cancel(|| log::info!("fetching breeds cancelled"));
            canceller
        })
    }

    /// Mark a dog request as in flight, then start the picture stream.
    ///
    /// `None` asks for dogs of any breed.
    pub fn fetch_dog(&self, breed: Option<String>) -> BreedsAction {
        let pictures = self.dog_stream(breed.clone());
        Action::sync_effect(Kind::FetchDog, move |dispatch| {
            dispatch.dispatch(actions::request_dog(breed.clone()));
            dispatch
                .dispatch(Action::stream_effect(Kind::DogStream, pictures.clone()))
                .into_canceller()
        })
    }

    fn dog_stream(&self, breed: Option<String>) -> StreamEffect<Kind, actions::Value> {
        let catalogue = self.clone();
        StreamEffect::new(
            move || catalogue.pictures(breed.clone()),
            actions::receive_dog,
            |error| actions::alert(error.to_string()),
        )
    }

    fn pictures(&self, breed: Option<String>) -> BoxStream<'static, Result<String, EffectError>> {
        if let Some(breed) = &breed {
            if !self.breeds.contains(breed) {
                let error = EffectError::failed(format!("unknown breed: {}", breed));
                return stream::once(async move { Err(error) }).boxed();
            }
        }
        if self.breeds.is_empty() {
            return stream::once(async { Err(EffectError::failed("no breeds available")) }).boxed();
        }

        let breeds = Arc::clone(&self.breeds);
        let delay = self.delay;
        stream::iter(0..self.dog_count)
            .then(move |n| {
                let breed = breed
                    .clone()
                    .unwrap_or_else(|| breeds[n % breeds.len()].clone());
                async move {
                    tokio::time::sleep(delay).await;
                    Ok(image_url(&breed, n))
                }
            })
            .boxed()
    }
}

fn image_url(breed: &str, n: usize) -> String {
    format!("https://images.dog.ceo/breeds/{}/{}.jpg", breed, n)
}
