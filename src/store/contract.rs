//! Behaviour every [`Store`] backend must share, run against each backend

use super::*;

fn config(interval: f64, magic_word: &str) -> TaskConfig {
    TaskConfig {
        interval,
        magic_word: magic_word.to_string(),
    }
}

fn finished(start_time: i64, end_time: i64, status: RunStatus, files: &[&str]) -> RunResult {
    let mut result = RunResult::running("foo", start_time);
    result.end_time = end_time;
    result.status = status;
    result.files = files.iter().map(|f| f.to_string()).collect();
    result
}

pub fn task_config_lazy_defaults(store: &dyn Store) {
    let defaults = config(30.0, "foo");
    let first = store.task_config(&defaults).unwrap();
    assert_eq!(first, defaults);

    // Different fallbacks on the second read must not re-synthesise
    let second = store.task_config(&config(99.0, "bar")).unwrap();
    assert_eq!(second, defaults);
}

pub fn task_config_replace(store: &dyn Store) {
    store.put_task_config(&config(5.0, "first")).unwrap();
    store.put_task_config(&config(7.5, "second")).unwrap();

    let current = store.task_config(&config(1.0, "default")).unwrap();
    assert_eq!(current, config(7.5, "second"));
}

pub fn append_and_update(store: &dyn Store) {
    let mut result = RunResult::running("foo", 100);
    let id = store.append_result(&result).unwrap();

    let page = store.results(0, 10).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, id);
    assert_eq!(page[0].result.status, RunStatus::Running);

    result.status = RunStatus::Success;
    result.end_time = 101;
    result.run_time = 1.0;
    result.occurrence = 3;
    result.files = vec!["a.txt".into(), "b.txt".into()];
    result.new_files = vec!["b.txt".into()];
    result.removed_files = vec!["c.txt".into()];
    store.update_result(id, &result).unwrap();

    let page = store.results(0, 10).unwrap();
    assert_eq!(page.len(), 1, "update must not append");
    assert_eq!(page[0].result, result);
}

pub fn update_unknown_id_fails(store: &dyn Store) {
    let result = RunResult::running("foo", 1);
    assert!(store.update_result(ResultId(4242), &result).is_err());
}

pub fn last_result_skips_running_and_failed(store: &dyn Store) {
    assert!(store.last_result().unwrap().is_none());

    store
        .append_result(&finished(10, 11, RunStatus::Success, &["old.txt"]))
        .unwrap();
    store
        .append_result(&finished(20, 21, RunStatus::Success, &["new.txt"]))
        .unwrap();
    store
        .append_result(&finished(30, 31, RunStatus::Failed, &[]))
        .unwrap();
    store
        .append_result(&RunResult::running("foo", 40))
        .unwrap();

    let last = store.last_result().unwrap().unwrap();
    assert_eq!(last.files, vec!["new.txt".to_string()]);
}

pub fn pagination_newest_first(store: &dyn Store) {
    for start_time in 1..=25 {
        store
            .append_result(&finished(start_time, start_time, RunStatus::Success, &[]))
            .unwrap();
    }

    let page: Vec<i64> = store
        .results(1, 10)
        .unwrap()
        .into_iter()
        .map(|stored| stored.result.start_time)
        .collect();
    assert_eq!(page, (6..=15).rev().collect::<Vec<_>>());

    assert_eq!(store.results(2, 10).unwrap().len(), 5);
    assert!(store.results(3, 10).unwrap().is_empty());
}

pub fn running_results(store: &dyn Store) {
    store
        .append_result(&finished(1, 2, RunStatus::Success, &[]))
        .unwrap();
    let stuck = store.append_result(&RunResult::running("foo", 3)).unwrap();

    let running = store.running_results().unwrap();
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, stuck);
}
