//! File descriptor limit detection for capping concurrently open input files (Unix).

/// Descriptors held by one ingest unit (the gzip file).
pub const FDS_PER_INGEST: usize = 1;

/// Fraction of the process FD limit to use (leave headroom for sockets and logging).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    // RLIM_INFINITY is typically !0 or u64::MAX; treat as "no practical limit"
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// How many files may be streamed at once while staying under ~80% of the FD limit, after
/// setting aside `reserved` descriptors (one socket per shard). `None` if no limit is known.
pub fn max_ingest_by_fd_limit(reserved: usize) -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = ((limit as f64 * FD_LIMIT_FRACTION) as usize).saturating_sub(reserved);
    Some((usable / FDS_PER_INGEST).max(1))
}
