use std::cell::Cell;
use std::rc::Rc;

use tempfile::tempdir;

use crate::host::{HostEnvironment, StaticHost, ThemeInfo};
use crate::kernel::bootstrap::Framework;
use crate::module_system::dependency::{ModuleDependency, PluginDependency, ThemeDependency};
use crate::module_system::lifecycle::ModuleRecord;
use crate::module_system::state::{LifecycleState, Mode};
use crate::module_system::traits::Hook;
use crate::storage::local::FileOptionStore;
use crate::storage::memory::MemoryOptionStore;
use crate::ui_bridge::NoticeKind;

use super::common::{
    SPACE, TrackedModule, framework_with_space, key, keys, register, take, tracker,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn saved_state(framework: &Framework, id: &str) -> LifecycleState {
    ModuleRecord::load(framework.store(), &key(id))
        .expect("load record")
        .saved_state
}

#[test]
fn test_first_run_activates_and_starts() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker));
    assert_eq!(take(&tracker), strings(&["load:a"]));

    let report = framework.handle_request().expect("request");
    assert!(report.notices.is_empty());
    assert_eq!(report.pass.activated, keys(&["a"]));
    assert_eq!(report.pass.started, keys(&["a"]));
    assert_eq!(take(&tracker), strings(&["activate:a", "startup:a"]));
    assert_eq!(report.pass.persisted, vec![(key("a"), LifecycleState::OnCanActivate)]);
    assert_eq!(saved_state(&framework, "a"), LifecycleState::OnCanActivate);
}

#[test]
fn test_dependency_vanishes_then_returns() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["y"]);
    register(&mut framework, TrackedModule::new("x", &tracker).depends_on(&["y"]));
    register(&mut framework, TrackedModule::new("y", &tracker));

    let first = framework.handle_request().expect("first request");
    assert_eq!(first.pass.activated, keys(&["y", "x"]));
    framework.end_request();
    take(&tracker);

    // Y switched off by the administrator knocks X out
    framework.set_mode(&key("y"), Mode::Off).expect("set mode");
    let second = framework.handle_request().expect("second request");

    assert_eq!(second.notices.len(), 1);
    assert_eq!(second.notices[0].kind, NoticeKind::Paused);
    assert_eq!(second.notices[0].modules[0].module_name, "Module X");
    assert_eq!(second.notices[0].modules[0].space_name, "Shop");
    assert_eq!(second.pass.paused, keys(&["x"]));
    assert_eq!(second.pass.deactivated, keys(&["y"]));
    assert!(second.pass.started.is_empty());
    assert_eq!(take(&tracker), strings(&["pause:x", "deactivate:y"]));
    assert_eq!(saved_state(&framework, "x"), LifecycleState::PauseCannotActivate);
    assert_eq!(saved_state(&framework, "y"), LifecycleState::OffCanActivate);
    framework.end_request();

    // Y back on: X resumes and administrators are told
    framework.set_mode(&key("y"), Mode::On).expect("set mode");
    let third = framework.handle_request().expect("third request");

    assert_eq!(third.notices.len(), 1);
    assert_eq!(third.notices[0].kind, NoticeKind::Resumed);
    // Off-but-able is not an activation from-state, so Y only starts
    assert!(third.pass.activated.is_empty());
    assert_eq!(third.pass.started, keys(&["y", "x"]));
    assert_eq!(third.pass.resumed, keys(&["x"]));
    assert_eq!(take(&tracker), strings(&["startup:y", "startup:x", "resume:x"]));
}

#[test]
fn test_pause_and_deactivate_run_dependents_first() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a", "b"]);
    register(&mut framework, TrackedModule::new("c", &tracker).depends_on(&["b"]));
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("a", &tracker));

    let first = framework.handle_request().expect("first request");
    assert_eq!(first.pass.started, keys(&["a", "b", "c"]));
    framework.end_request();
    take(&tracker);

    framework.set_mode(&key("a"), Mode::Off).expect("set mode");
    let second = framework.handle_request().expect("second request");

    assert_eq!(second.pass.paused, keys(&["c", "b"]));
    assert_eq!(second.pass.deactivated, keys(&["a"]));
    assert_eq!(take(&tracker), strings(&["pause:c", "pause:b", "deactivate:a"]));
    let paused_names: Vec<&str> = second.notices[0]
        .modules
        .iter()
        .map(|entry| entry.module_name.as_str())
        .collect();
    assert_eq!(paused_names, vec!["Module B", "Module C"]);
}

#[test]
fn test_switched_off_chain_deactivates_dependents_first() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["b"]);
    register(&mut framework, TrackedModule::new("a", &tracker).depends_on(&["b"]));
    register(&mut framework, TrackedModule::new("b", &tracker));

    framework.handle_request().expect("first request");
    framework.end_request();
    take(&tracker);

    framework.set_mode(&key("a"), Mode::Off).expect("set mode");
    framework.set_mode(&key("b"), Mode::Off).expect("set mode");
    let second = framework.handle_request().expect("second request");

    assert!(second.notices.is_empty());
    assert!(second.pass.paused.is_empty());
    assert_eq!(second.pass.deactivated, keys(&["a", "b"]));
    assert_eq!(take(&tracker), strings(&["deactivate:a", "deactivate:b"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::OffCannotActivate);
    assert_eq!(saved_state(&framework, "b"), LifecycleState::OffCanActivate);
}

#[test]
fn test_user_pause_is_not_notified() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker));
    framework.handle_request().expect("first request");
    framework.end_request();
    take(&tracker);

    framework.set_mode(&key("a"), Mode::Pause).expect("set mode");
    let paused = framework.handle_request().expect("pause request");
    assert!(paused.notices.is_empty());
    assert_eq!(paused.pass.paused, keys(&["a"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::PauseCanActivate);

    framework.set_mode(&key("a"), Mode::On).expect("set mode");
    let resumed = framework.handle_request().expect("resume request");
    assert!(resumed.notices.is_empty());
    assert_eq!(resumed.pass.resumed, keys(&["a"]));
    assert!(resumed.pass.activated.is_empty());
    assert_eq!(take(&tracker), strings(&["pause:a", "startup:a", "resume:a"]));
}

#[test]
fn test_unregistered_dependency_blocks_module() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker).depends_on(&["ghost"]));
    take(&tracker);

    let report = framework.handle_request().expect("request");
    assert!(report.pass.activated.is_empty());
    assert!(report.pass.started.is_empty());
    assert!(take(&tracker).is_empty());

    let status = framework.status(&key("a")).expect("status");
    assert_eq!(status.current_state, LifecycleState::PauseCannotActivate);
    assert_eq!(status.mode, Mode::On);
    assert_eq!(status.unmet, strings(&["(Unregistered dependency: \"ghost\")"]));
    assert!(!framework.module_dep_met("ghost").expect("dep check"));
}

#[test]
fn test_startup_is_idempotent_within_a_request() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker));
    take(&tracker);

    framework.handle_request().expect("first pass");
    let again = framework.handle_request().expect("second pass");
    assert!(again.pass.started.is_empty());
    // Saved state was on, so activation repeats; start-up does not
    assert_eq!(take(&tracker), strings(&["activate:a", "startup:a", "activate:a"]));

    let ended = framework.end_request();
    assert_eq!(ended.shut_down, keys(&["a"]));
    assert_eq!(take(&tracker), strings(&["shutdown:a"]));

    // Nothing left to shut down
    assert!(framework.end_request().shut_down.is_empty());
}

#[test]
fn test_end_request_shuts_down_in_start_order() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a"]);
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("a", &tracker));

    framework.handle_request().expect("request");
    take(&tracker);
    let ended = framework.end_request();
    assert_eq!(ended.shut_down, keys(&["a", "b"]));
    assert_eq!(take(&tracker), strings(&["shutdown:a", "shutdown:b"]));
    assert!(framework.statuses().expect("statuses").iter().all(|s| !s.running));
}

#[test]
fn test_hook_failure_is_reported_not_fatal() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker).failing_on(Hook::Activate));
    register(&mut framework, TrackedModule::new("b", &tracker));

    let report = framework.handle_request().expect("request");
    assert_eq!(report.pass.failures.len(), 1);
    assert_eq!(report.pass.failures[0].module, key("a"));
    assert_eq!(report.pass.failures[0].hook, Hook::Activate);
    assert!(report.pass.failures[0].message.contains("a exploded"));
    assert_eq!(report.pass.activated, keys(&["b"]));
    assert_eq!(report.pass.started, keys(&["a", "b"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::OnCanActivate);
}

#[test]
fn test_failed_startup_still_shuts_down() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker).failing_on(Hook::Startup));

    let report = framework.handle_request().expect("request");
    assert_eq!(report.pass.failures[0].hook, Hook::Startup);
    assert_eq!(framework.end_request().shut_down, keys(&["a"]));
}

#[test]
fn test_cycle_members_cannot_activate() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a", "b"]);
    register(&mut framework, TrackedModule::new("a", &tracker).depends_on(&["b"]));
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("c", &tracker));

    let report = framework.handle_request().expect("request");
    assert_eq!(report.pass.started, keys(&["c"]));
    for status in framework.statuses().expect("statuses") {
        if status.key.module == "c" {
            assert_eq!(status.current_state, LifecycleState::OnCanActivate);
        } else {
            assert_eq!(status.current_state, LifecycleState::PauseCannotActivate);
        }
    }
}

#[test]
fn test_framework_deactivation_forces_everything_off() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a"]);
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("a", &tracker));
    framework.set_mode(&key("a"), Mode::Off).expect("set mode");
    take(&tracker);

    let report = framework.on_framework_deactivated().expect("force deactivate");
    assert_eq!(report.deactivated, keys(&["b", "a"]));
    assert_eq!(take(&tracker), strings(&["deactivate:b", "deactivate:a"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::ForcedOff);
    assert_eq!(saved_state(&framework, "b"), LifecycleState::ForcedOff);
    assert!(framework.statuses().expect("statuses").iter().all(|s| s.forced_off
        && s.current_state == LifecycleState::ForcedOff));
}

#[test]
fn test_forced_off_modules_activate_in_next_process() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let path = temp_dir.path().join("options.json");
    let tracker = tracker();

    let build = |tracker: &super::common::Tracker| {
        let store = FileOptionStore::new(path.clone()).expect("file store");
        let mut framework = Framework::new(Box::new(store), Box::new(StaticHost::new()));
        framework.create_space(SPACE, "Shop").expect("space");
        register(&mut framework, TrackedModule::new("a", tracker));
        framework
    };

    let first = build(&tracker);
    first.on_framework_deactivated().expect("force deactivate");
    drop(first);
    take(&tracker);

    let mut second = build(&tracker);
    let report = second.handle_request().expect("request");
    assert_eq!(report.pass.activated, keys(&["a"]));
    assert_eq!(take(&tracker), strings(&["load:a", "activate:a", "startup:a"]));
}

#[test]
fn test_plugin_deactivation_only_touches_its_modules() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker).hosted_by("pack/pack.php"));
    register(&mut framework, TrackedModule::new("b", &tracker));
    framework.handle_request().expect("request");
    take(&tracker);

    let report = framework.on_plugin_deactivated("pack/pack.php").expect("plugin deactivated");
    assert_eq!(report.deactivated, keys(&["a"]));
    assert_eq!(take(&tracker), strings(&["deactivate:a"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::ForcedOff);
    assert_eq!(saved_state(&framework, "b"), LifecycleState::OnCanActivate);
}

#[test]
fn test_uninstall_deletes_records() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a"]);
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("a", &tracker));
    framework.set_mode(&key("a"), Mode::Pause).expect("set mode");
    framework.handle_request().expect("request");
    take(&tracker);

    let report = framework.on_framework_uninstalled().expect("uninstall");
    assert_eq!(report.uninstalled, keys(&["b", "a"]));
    assert_eq!(take(&tracker), strings(&["uninstall:b", "uninstall:a"]));
    for id in ["a", "b"] {
        let store = framework.store();
        assert_eq!(store.get(&ModuleRecord::mode_key(&key(id))).expect("get"), None);
        assert_eq!(store.get(&ModuleRecord::state_key(&key(id))).expect("get"), None);
    }
}

#[test]
fn test_plugin_uninstall_only_touches_its_modules() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    register(&mut framework, TrackedModule::new("a", &tracker).hosted_by("pack/pack.php"));
    register(&mut framework, TrackedModule::new("b", &tracker));
    framework.handle_request().expect("request");

    let report = framework.on_plugin_uninstalled("pack/pack.php").expect("plugin uninstalled");
    assert_eq!(report.uninstalled, keys(&["a"]));
    assert_eq!(saved_state(&framework, "a"), LifecycleState::Unknown);
    assert_eq!(saved_state(&framework, "b"), LifecycleState::OnCanActivate);
}

#[test]
fn test_plugin_and_theme_dependencies_follow_host() {
    let tracker = tracker();
    let host = StaticHost::new()
        .with_plugin("woo/woo.php", Some("8.3.0"))
        .with_theme(ThemeInfo::new("Astra", "BSF"));
    let mut framework = Framework::new(Box::new(MemoryOptionStore::new()), Box::new(host));
    framework.create_space(SPACE, "Shop").expect("space");
    framework
        .register_dependency(PluginDependency::new("woo", "WooCommerce", "woo/woo.php").into())
        .expect("plugin dependency");
    framework
        .register_dependency(ThemeDependency::new("astra", "Astra", "BSF").into())
        .expect("theme dependency");
    register(
        &mut framework,
        TrackedModule::new("cart", &tracker).needs_plugin("woo").needs_theme("astra"),
    );

    assert!(framework.plugin_dep_met("woo").expect("check"));
    assert!(framework.theme_dep_met("astra").expect("check"));
    assert_eq!(framework.handle_request().expect("request").pass.started, keys(&["cart"]));
    framework.end_request();

    // WooCommerce goes away
    framework.replace_host(Box::new(StaticHost::new().with_theme(ThemeInfo::new("Astra", "BSF"))));
    let report = framework.handle_request().expect("request");
    assert_eq!(report.notices[0].kind, NoticeKind::Paused);
    assert_eq!(report.pass.paused, keys(&["cart"]));
    let status = framework.status(&key("cart")).expect("status");
    assert_eq!(status.unmet, strings(&["WooCommerce"]));
}

#[test]
fn test_cross_space_dependency() {
    let tracker = tracker();
    let mut framework = framework_with_space(&[]);
    framework.create_space("core", "Core").expect("space");
    framework
        .register_dependency(ModuleDependency::new("core", "auth").into())
        .expect("dependency");
    register(&mut framework, TrackedModule::new("cart", &tracker).depends_on(&["auth"]));
    framework
        .register_module("core", Box::new(TrackedModule::new("auth", &tracker)))
        .expect("register auth");

    let report = framework.handle_request().expect("request");
    let started: Vec<String> = report.pass.started.iter().map(|k| k.to_string()).collect();
    assert_eq!(started, strings(&["core/auth", "shop/cart"]));
}

/// Counts how often plugin activation is queried
#[derive(Debug)]
struct CountingHost {
    queries: Rc<Cell<usize>>,
}

impl HostEnvironment for CountingHost {
    fn is_plugin_active(&self, _file: &str) -> bool {
        self.queries.set(self.queries.get() + 1);
        true
    }

    fn plugin_version(&self, _file: &str) -> Option<String> {
        None
    }

    fn active_theme(&self) -> Option<ThemeInfo> {
        None
    }
}

#[test]
fn test_layered_dependencies_are_evaluated_once_per_view() {
    const LAYERS: usize = 20;
    let ids: Vec<String> = (0..LAYERS)
        .flat_map(|layer| [format!("l{}_left", layer), format!("l{}_right", layer)])
        .collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let tracker = tracker();
    let queries = Rc::new(Cell::new(0));
    let mut framework = framework_with_space(&id_refs);
    framework.replace_host(Box::new(CountingHost { queries: Rc::clone(&queries) }));
    framework
        .register_dependency(PluginDependency::new("woo", "WooCommerce", "woo/woo.php").into())
        .expect("register plugin dependency");

    // Every module needs both modules of the layer below it
    for layer in 0..LAYERS {
        for side in ["left", "right"] {
            let id = format!("l{}_{}", layer, side);
            let module = if layer == 0 {
                TrackedModule::new(&id, &tracker).needs_plugin("woo")
            } else {
                let below = [format!("l{}_left", layer - 1), format!("l{}_right", layer - 1)];
                TrackedModule::new(&id, &tracker).depends_on(&[below[0].as_str(), below[1].as_str()])
            };
            register(&mut framework, module);
        }
    }

    let report = framework.handle_request().expect("request");
    assert_eq!(report.pass.started.len(), LAYERS * 2);
    assert_eq!(
        report.pass.started.last().map(|key| key.module.as_str()),
        Some(format!("l{}_right", LAYERS - 1).as_str())
    );
    // Two bottom modules per state view, not one walk per path
    assert!(queries.get() <= 8, "host queried {} times", queries.get());
}

#[test]
fn test_cycle_dependents_stay_blocked() {
    let tracker = tracker();
    let mut framework = framework_with_space(&["a", "b", "c"]);
    register(&mut framework, TrackedModule::new("d", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("a", &tracker).depends_on(&["b"]));
    register(&mut framework, TrackedModule::new("b", &tracker).depends_on(&["a"]));
    register(&mut framework, TrackedModule::new("e", &tracker).depends_on(&["c"]));
    register(&mut framework, TrackedModule::new("c", &tracker));

    let report = framework.handle_request().expect("request");
    assert_eq!(report.pass.started, keys(&["c", "e"]));

    let engine = framework.engine();
    let view = engine.view().expect("view");
    for id in ["b", "d", "a"] {
        assert_eq!(view.state_of(&key(id)), Some(LifecycleState::PauseCannotActivate), "{}", id);
    }
    assert_eq!(view.state_of(&key("e")), Some(LifecycleState::OnCanActivate));
}
