use anyhow::Context;
use futures::StreamExt;
use reduxift::middleware::{
    AsyncEffectMiddleware, LoggingMiddleware, StreamEffectMiddleware, SyncEffectMiddleware,
    ThreadAffinityMiddleware,
};
use reduxift::{RunLoop, Store, Transition};
use std::time::Duration;

mod actions;
mod config;
mod effects;
mod logger;
mod reducers;
mod state;

use actions::{Kind, Value};
use config::BreedsConfig;
use effects::Catalogue;
use state::BreedsState;

fn main() -> anyhow::Result<()> {
    // Config first so its log level applies; anything it logs before init is lost
    let config = BreedsConfig::load();
    logger::init(&config.log_level).context("Failed to initialize logger")?;

    log::info!("Starting reduxift-breeds");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    // State changes happen on this thread; effects call back from the runtime
    let run_loop = RunLoop::new("main");
    let catalogue = Catalogue::new(&config, runtime.handle().clone());

    // Middleware runs in this order
    let store = Store::builder(BreedsState::default(), reducers::reduce)
        .add_middleware(LoggingMiddleware::new("breeds").with_state(describe))
        .add_middleware(ThreadAffinityMiddleware::new(run_loop.handle()))
        .add_middleware(SyncEffectMiddleware::new())
        .add_middleware(AsyncEffectMiddleware::new())
        .add_middleware(StreamEffectMiddleware::new(runtime.handle().clone()))
        .build();

    let printer = store.subscribe(print_transition);

    let mut applied = store.actions();
    runtime.spawn(async move {
        let mut count = 0usize;
        while let Some(action) = applied.next().await {
            count += 1;
            log::trace!("applied #{}: {:?}", count, action.kind());
        }
        log::debug!("Action stream ended after {} actions", count);
    });

    let timeout = config.fetch_delay() * 4 + Duration::from_secs(1);

    store.dispatch(actions::alert("welcome!"));
    store.dispatch(actions::clear_alert());

    store.dispatch(catalogue.fetch_breeds());
    if !run_loop.run_until(timeout, || !store.state().breeds.is_empty()) {
        log::warn!("Breed list did not arrive within {:?}", timeout);
    }

    // A second fetch, cancelled before it can land
    if let Some(canceller) = store.dispatch(catalogue.fetch_breeds()).into_canceller() {
        canceller.cancel();
        store.dispatch(actions::alert("user cancelled"));
    }
    run_loop.run_until(config.fetch_delay() * 2, || false);

    let breed = store.state().breeds.first().cloned();
    let wanted = config.dog_count;
    store.dispatch(catalogue.fetch_dog(breed));
    let stream_timeout = timeout * (wanted as u32 + 1);
    if !run_loop.run_until(stream_timeout, || store.state().dog.received >= wanted) {
        log::warn!("Only {} of {} dogs arrived", store.state().dog.received, wanted);
    }

    store.dispatch(catalogue.fetch_dog(Some("dragon".to_string())));
    run_loop.run_until(timeout, || !store.state().dog.fetching);

    log::info!(
        "Exiting reduxift-breeds: {} breeds, last dog {:?}",
        store.state().breeds.len(),
        store.state().dog.image_url
    );

    printer.unsubscribe();
    drop(store);
    runtime.shutdown_timeout(Duration::from_millis(100));
    Ok(())
}

fn describe(state: &BreedsState) -> String {
    format!(
        "breeds={} alert={:?} dog={:?} fetching={}",
        state.breeds.len(),
        state.alert,
        state.dog.image_url,
        state.dog.fetching
    )
}

fn print_transition(transition: &Transition<BreedsState, Kind, Value>) {
    let Some(action) = &transition.action else {
        println!("ready");
        return;
    };

    match action.kind() {
        Kind::Reload => println!("breeds: {}", transition.state.breeds.join(", ")),
        Kind::Alert => println!("alert: {}", transition.state.alert),
        Kind::ClearAlert => println!("alert dismissed"),
        Kind::RequestDog => println!("fetching a dog..."),
        Kind::ReceiveDog => println!("dog: {}", transition.state.dog.image_url),
        Kind::Fetch | Kind::FetchDog | Kind::DogStream => {}
    }
}
