//! Component binding
//!
//! Connects a UI component to its declared queries. The component is
//! re-rendered with a fresh [`Snapshot`] on every state change; the binding
//! hands out a cheap [`LoadHandle`] for imperative loads and tears the
//! manager down when dropped.

use std::sync::Arc;

use serde_json::Value;

use crate::error::BindError;
use crate::manager::{ManagerBuilder, QueryManager};
use crate::query::{LoadOptions, QuerySpec};
use crate::state::Snapshot;

/// Anything that renders from query props
pub trait Component: Send + Sync + 'static {
    fn render(&self, props: &Snapshot);
}

impl<F> Component for F
where
    F: Fn(&Snapshot) + Send + Sync + 'static,
{
    fn render(&self, props: &Snapshot) {
        self(props)
    }
}

/// A mounted component and its queries
pub struct Binding<C: Component> {
    component: Arc<C>,
    manager: QueryManager,
}

impl<C: Component> Binding<C> {
    /// Mount `component` with `specs`, rendering it once with the initial props
    pub fn mount(
        component: Arc<C>,
        builder: ManagerBuilder,
        specs: Vec<QuerySpec>,
    ) -> Result<Self, BindError> {
        let target = Arc::clone(&component);
        let manager = builder
            .on_render(move |props| target.render(props))
            .mount(specs)?;

        component.render(&manager.snapshot());
        Ok(Self { component, manager })
    }

    pub fn handle(&self) -> LoadHandle {
        LoadHandle {
            manager: self.manager.clone(),
        }
    }

    /// Props as they would be rendered right now
    pub fn props(&self) -> Snapshot {
        self.manager.snapshot()
    }

    pub fn component(&self) -> &Arc<C> {
        &self.component
    }

    pub fn manager(&self) -> &QueryManager {
        &self.manager
    }
}

impl<C: Component> Drop for Binding<C> {
    fn drop(&mut self) {
        self.manager.dispose();
    }
}

/// Imperative `load` handle given to the component
#[derive(Clone, Debug)]
pub struct LoadHandle {
    manager: QueryManager,
}

impl LoadHandle {
    pub fn load(&self, name: &str, params: Value, options: LoadOptions) -> Result<(), BindError> {
        self.manager.load(name, params, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigStore;
    use crate::state::QueryStatus;
    use crate::transport::{MockReply, MockTransport};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        renders: Mutex<Vec<Value>>,
    }

    impl Component for Recorder {
        fn render(&self, props: &Snapshot) {
            self.renders.lock().push(props.to_json());
        }
    }

    fn builder(mock: Arc<MockTransport>) -> ManagerBuilder {
        let config = ConfigStore::new();
        config.set("baseUrl", "http://api.test");
        ManagerBuilder::new(mock).config(config)
    }

    #[tokio::test(start_paused = true)]
    async fn renders_initial_loading_and_final_props() {
        let mock = Arc::new(MockTransport::with_replies(vec![
            MockReply::ok(json!([{"id": 1}])).after(Duration::from_millis(50))
        ]));
        let recorder = Arc::new(Recorder::default());
        let binding = Binding::mount(
            Arc::clone(&recorder),
            builder(mock),
            vec![QuerySpec::new("/users/")],
        )
        .unwrap();

        binding.manager().settled().await;

        let renders = recorder.renders.lock().clone();
        // auto-load render, then the mount render, then completion
        assert_eq!(renders.len(), 3);
        assert_eq!(renders[0]["users_status"], "loading");
        assert_eq!(renders[1]["users_status"], "loading");
        assert_eq!(renders[2], json!({"users": [{"id": 1}], "users_status": "ok"}));
    }

    #[tokio::test(start_paused = true)]
    async fn handle_loads_through_binding() {
        let mock = Arc::new(MockTransport::new());
        let binding = Binding::mount(
            Arc::new(|_: &Snapshot| {}),
            builder(Arc::clone(&mock)),
            vec![QuerySpec::new("users").auto_load(false)],
        )
        .unwrap();

        let handle = binding.handle();
        handle
            .load("users", json!({"page": 2}), LoadOptions::default())
            .unwrap();
        binding.manager().settled().await;

        assert_eq!(mock.request_count(), 1);
        assert_eq!(binding.props().status("users"), Some(&QueryStatus::Ok));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_disposes_manager() {
        let mock = Arc::new(MockTransport::new());
        let binding = Binding::mount(
            Arc::new(Recorder::default()),
            builder(Arc::clone(&mock)),
            vec![QuerySpec::new("users").auto_load(false)],
        )
        .unwrap();
        let handle = binding.handle();
        handle.load("users", json!({}), LoadOptions::default()).unwrap();

        drop(binding);
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(mock.request_count(), 0);
        assert!(matches!(
            handle.load("users", json!({}), LoadOptions::default()),
            Err(BindError::Disposed { .. })
        ));
    }
}
