#![cfg(target_os = "linux")]
#![allow(unsafe_code)] // POSIX shared memory and process-shared pthread primitives require unsafe

use std::ffi::CString;
use std::io;
use std::mem;
use std::ptr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ShmError {
    #[error("invalid shared memory name '{0}'")]
    InvalidName(String),
    #[error("shared memory '{name}' not found: {source}")]
    NotFound {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("shared memory '{0}' has no valid header")]
    InvalidHeader(String),
    #[error("shared memory creation failed: {0}")]
    CreationFailed(io::Error),
    #[error("shared memory mapping failed: {0}")]
    MapFailed(io::Error),
    #[error("{op} failed with error code {code}")]
    Pthread { op: &'static str, code: i32 },
}

/// Region header, followed by `size` bytes of frame data.
///
/// The mutex and condition variable are process-shared; the producer holds
/// the mutex while writing and broadcasts the condition after each frame.
#[repr(C)]
struct RegionHeader {
    size: u32,
    mutex: libc::pthread_mutex_t,
    condition: libc::pthread_cond_t,
}

const HEADER_LEN: usize = mem::size_of::<RegionHeader>();

/// A mapped POSIX shared memory region with its lock and frame signal.
pub struct SharedRegion {
    name: String,
    c_name: CString,
    base: *mut u8,
    map_len: usize,
    data_len: usize,
    owner: bool,
}

// The mapping is only read or written while holding the region's
// process-shared mutex.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

/// Turn a user-supplied name into a POSIX shm name (`/name`).
pub fn normalize_name(name: &str) -> Result<String, ShmError> {
    let trimmed = name.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\0') {
        return Err(ShmError::InvalidName(name.to_string()));
    }
    Ok(format!("/{trimmed}"))
}

impl SharedRegion {
    /// Attach to an existing region created by a producer.
    pub fn open(name: &str) -> Result<Self, ShmError> {
        let name = normalize_name(name)?;
        let c_name = CString::new(name.clone()).map_err(|_| ShmError::InvalidName(name.clone()))?;

        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(ShmError::NotFound {
                name,
                source: io::Error::last_os_error(),
            });
        }

        let mut stat: libc::stat = unsafe { mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut stat) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(ShmError::MapFailed(err));
        }

        let map_len = stat.st_size as usize;
        if map_len < HEADER_LEN {
            unsafe { libc::close(fd) };
            return Err(ShmError::InvalidHeader(name));
        }

        let base = map(fd, map_len);
        unsafe { libc::close(fd) };
        let base = base.map_err(ShmError::MapFailed)?;

        // size is written once by the producer before any consumer can open
        let declared = unsafe { ptr::read(base as *const u32) } as usize;
        let data_len = declared.min(map_len - HEADER_LEN);

        debug!(%name, map_len, data_len, "attached shared region");
        Ok(Self {
            name,
            c_name,
            base,
            map_len,
            data_len,
            owner: false,
        })
    }

    /// Create and initialise a region with `data_len` bytes of frame data.
    ///
    /// The creating side owns the name and unlinks it on drop.
    pub fn create(name: &str, data_len: usize) -> Result<Self, ShmError> {
        let name = normalize_name(name)?;
        let c_name = CString::new(name.clone()).map_err(|_| ShmError::InvalidName(name.clone()))?;
        let declared = u32::try_from(data_len)
            .map_err(|_| ShmError::CreationFailed(io::Error::from(io::ErrorKind::InvalidInput)))?;

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::mode_t,
            )
        };
        if fd < 0 {
            return Err(ShmError::CreationFailed(io::Error::last_os_error()));
        }

        let map_len = HEADER_LEN + data_len;
        if unsafe { libc::ftruncate(fd, map_len as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(ShmError::CreationFailed(err));
        }

        let base = map(fd, map_len);
        unsafe { libc::close(fd) };
        let base = match base {
            Ok(base) => base,
            Err(e) => {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(ShmError::MapFailed(e));
            }
        };

        let region = Self {
            name,
            c_name,
            base,
            map_len,
            data_len,
            owner: true,
        };
        // From here on, drop unmaps and unlinks on failure
        unsafe { region.init_header(declared)? };
        Ok(region)
    }

    unsafe fn init_header(&self, declared: u32) -> Result<(), ShmError> {
        let header = self.header();
        ptr::write(ptr::addr_of_mut!((*header).size), declared);

        let mut mutex_attr: libc::pthread_mutexattr_t = mem::zeroed();
        check("pthread_mutexattr_init", libc::pthread_mutexattr_init(&mut mutex_attr))?;
        check(
            "pthread_mutexattr_setpshared",
            libc::pthread_mutexattr_setpshared(&mut mutex_attr, libc::PTHREAD_PROCESS_SHARED),
        )?;
        let rc = libc::pthread_mutex_init(ptr::addr_of_mut!((*header).mutex), &mutex_attr);
        libc::pthread_mutexattr_destroy(&mut mutex_attr);
        check("pthread_mutex_init", rc)?;

        let mut cond_attr: libc::pthread_condattr_t = mem::zeroed();
        check("pthread_condattr_init", libc::pthread_condattr_init(&mut cond_attr))?;
        check(
            "pthread_condattr_setpshared",
            libc::pthread_condattr_setpshared(&mut cond_attr, libc::PTHREAD_PROCESS_SHARED),
        )?;
        let rc = libc::pthread_cond_init(ptr::addr_of_mut!((*header).condition), &cond_attr);
        libc::pthread_condattr_destroy(&mut cond_attr);
        check("pthread_cond_init", rc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes of frame data behind the header.
    pub fn size(&self) -> usize {
        self.data_len
    }

    fn header(&self) -> *mut RegionHeader {
        self.base as *mut RegionHeader
    }

    fn mutex(&self) -> *mut libc::pthread_mutex_t {
        unsafe { ptr::addr_of_mut!((*self.header()).mutex) }
    }

    fn condition(&self) -> *mut libc::pthread_cond_t {
        unsafe { ptr::addr_of_mut!((*self.header()).condition) }
    }

    /// Take the region's exclusive lock. Released when the guard drops.
    pub fn lock(&self) -> Result<RegionLock<'_>, ShmError> {
        check("pthread_mutex_lock", unsafe { libc::pthread_mutex_lock(self.mutex()) })?;
        Ok(RegionLock { region: self })
    }

    /// Block until the producer signals the next frame.
    pub fn wait(&self) -> Result<(), ShmError> {
        let guard = self.lock()?;
        let rc = unsafe { libc::pthread_cond_wait(self.condition(), self.mutex()) };
        drop(guard);
        check("pthread_cond_wait", rc)
    }

    /// Like [`wait`](Self::wait), bounded by `timeout`. Returns `false` if the
    /// timeout elapsed without a signal.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, ShmError> {
        let deadline = deadline_after(timeout);
        let guard = self.lock()?;
        let rc = unsafe { libc::pthread_cond_timedwait(self.condition(), self.mutex(), &deadline) };
        drop(guard);
        match rc {
            0 => Ok(true),
            libc::ETIMEDOUT => Ok(false),
            code => Err(ShmError::Pthread {
                op: "pthread_cond_timedwait",
                code,
            }),
        }
    }

    /// Wake every waiting consumer.
    pub fn notify_all(&self) -> Result<(), ShmError> {
        check("pthread_cond_broadcast", unsafe {
            libc::pthread_cond_broadcast(self.condition())
        })
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.map_len);
            if self.owner {
                libc::shm_unlink(self.c_name.as_ptr());
            }
        }
    }
}

/// Exclusive access to a region's data. Unlocks on drop.
pub struct RegionLock<'a> {
    region: &'a SharedRegion,
}

impl RegionLock<'_> {
    pub fn data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.region.base.add(HEADER_LEN), self.region.data_len) }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        unsafe {
            std::slice::from_raw_parts_mut(self.region.base.add(HEADER_LEN), self.region.data_len)
        }
    }
}

impl Drop for RegionLock<'_> {
    fn drop(&mut self) {
        let rc = unsafe { libc::pthread_mutex_unlock(self.region.mutex()) };
        if rc != 0 {
            warn!(name = %self.region.name, code = rc, "failed to unlock shared region");
        }
    }
}

fn map(fd: libc::c_int, len: usize) -> io::Result<*mut u8> {
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(addr as *mut u8)
}

fn check(op: &'static str, code: libc::c_int) -> Result<(), ShmError> {
    if code == 0 {
        Ok(())
    } else {
        Err(ShmError::Pthread { op, code })
    }
}

/// Absolute CLOCK_REALTIME deadline, as pthread_cond_timedwait expects.
fn deadline_after(timeout: Duration) -> libc::timespec {
    let mut now: libc::timespec = unsafe { mem::zeroed() };
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };

    let mut sec = now.tv_sec as i64 + timeout.as_secs() as i64;
    let mut nsec = now.tv_nsec as i64 + i64::from(timeout.subsec_nanos());
    if nsec >= 1_000_000_000 {
        sec += 1;
        nsec -= 1_000_000_000;
    }
    libc::timespec {
        tv_sec: sec as libc::time_t,
        tv_nsec: nsec as _,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_name() -> String {
        format!(
            "vat-shm-test-{}-{}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        )
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("img.argb").unwrap(), "/img.argb");
        assert_eq!(normalize_name("/img.argb").unwrap(), "/img.argb");
        assert!(normalize_name("").is_err());
        assert!(normalize_name("/").is_err());
        assert!(normalize_name("a/b").is_err());
    }

    #[test]
    fn test_open_missing_region() {
        let err = SharedRegion::open(&unique_name()).err().unwrap();
        assert!(matches!(err, ShmError::NotFound { .. }));
    }

    #[test]
    fn test_create_then_open_shares_data() {
        let name = unique_name();
        let producer = SharedRegion::create(&name, 64).unwrap();
        {
            let mut lock = producer.lock().unwrap();
            lock.data_mut().fill(0xAB);
        }

        let consumer = SharedRegion::open(&name).unwrap();
        assert_eq!(consumer.size(), 64);
        assert_eq!(consumer.name(), format!("/{name}"));
        let lock = consumer.lock().unwrap();
        assert!(lock.data().iter().all(|b| *b == 0xAB));
    }

    #[test]
    fn test_wait_timeout_without_signal() {
        let region = SharedRegion::create(&unique_name(), 4).unwrap();
        assert!(!region.wait_timeout(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_region_unlinked_when_owner_drops() {
        let name = unique_name();
        drop(SharedRegion::create(&name, 4).unwrap());
        assert!(SharedRegion::open(&name).is_err());
    }
}
