/// Generic rqcast Error
#[derive(Debug)]
pub struct RqcastError(pub std::io::Error);

///
pub type Result<T> = std::result::Result<T, RqcastError>;

impl RqcastError {
    /// Return a new rqcast Error with a message
    pub fn new<E>(msg: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>> + std::fmt::Debug,
    {
        log::error!("{:?}", msg);
        RqcastError(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    /// Return a new rqcast Error
    pub fn new_kind<E>(kind: std::io::ErrorKind, msg: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>> + std::fmt::Debug,
    {
        log::error!("{:?}", msg);
        RqcastError(std::io::Error::new(kind, msg))
    }
}

impl std::fmt::Display for RqcastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<std::io::Error> for RqcastError {
    fn from(err: std::io::Error) -> Self {
        log::error!("{:?}", err);
        RqcastError(err)
    }
}
