/// `Some(v) => v`, otherwise `continue` the enclosing loop.
#[macro_export]
macro_rules! unwrap_option_or_continue {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => continue,
        }
    };
}

/// `Some(v) => v`, otherwise return from the enclosing function, with `$ret` if given.
#[macro_export]
macro_rules! unwrap_option_or_return {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => return,
        }
    };
    ($e:expr, $ret:expr) => {
        match $e {
            Some(v) => v,
            None => return $ret,
        }
    };
}

/// Like `unwrap_option_or_return!`, but logs the skipped operation at trace level first.
#[macro_export]
macro_rules! unwrap_alive_or_return {
    ($e:expr, $what:literal, $ret:expr) => {
        match $e {
            Some(v) => v,
            None => {
                log::trace!(concat!("ignored ", $what, ": target is gone"));
                return $ret;
            }
        }
    };
}
