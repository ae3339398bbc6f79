use std::{str::FromStr, time::Duration};

/// Read a positive numeric override from the environment.
///
/// Missing, unparsable, or zero values yield `None` so callers keep their defaults.
pub(crate) fn positive_var<T>(name: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|n| *n > T::default())
}

/// Read a positive millisecond override from the environment.
pub(crate) fn millis_var(name: &str) -> Option<Duration> {
    positive_var::<u64>(name).map(Duration::from_millis)
}
