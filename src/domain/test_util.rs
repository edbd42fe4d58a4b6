use crate::domain::clock::Clock;
use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Connectivity represents the "connected" state of a mocked driven port and provides
/// common behavior for returning an error if the port is configured to be in a disconnected state.
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Return an error if connectivity is in a "disconnected" state
    pub fn blow_up_if_disconnected(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Connected => Ok(()),
            Self::Disconnected => Err(anyhow!("could not connect to service!")),
        }
    }
}

/// A [Clock] frozen at a single instant
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock reading noon UTC on the given day
    pub fn at_noon(year: i32, month: u32, day: u32) -> FixedClock {
        FixedClock(
            Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
                .single()
                .expect("test clock date should be valid"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shorthand for building calendar dates in tests
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
}

/// FakeImplementation is a quick drop-in property that helps mock a function and capture
/// arguments the function is called with. It's useful for mocking async functions since
/// popular rust mocking tools don't work well with async functions on traits.
///
/// * [Args] represents the arguments passed to the function that should be captured on a call
/// * [Ret] represents the type of the function's return value
///
/// # Example
///
/// ```ignore
/// use domain::test_util::FakeImplementation;
/// use std::sync::Mutex;
///
/// trait StreakSource {
///   async fn streak_for(&self, user_id: i32, day: NaiveDate) -> u32;
/// }
///
/// struct FakeStreakSource {
///   // (i32, NaiveDate) are the captured arguments and u32 is the return value
///   streak_for_result: FakeImplementation<(i32, NaiveDate), u32>,
/// }
///
/// impl StreakSource for Mutex<FakeStreakSource> {
///   async fn streak_for(&self, user_id: i32, day: NaiveDate) -> u32 {
///     // Lock "self" so the interior can be mutated through an immutable reference
///     let mut self_locked = self.lock().unwrap();
///     self_locked.streak_for_result.save_arguments((user_id, day));
///     self_locked.streak_for_result.return_value()
///   }
/// }
/// ```
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    /// Creates a new FakeImplementation
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    /// Saves arguments from a single invocation of the FakeImplementation
    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Returns the list of arguments passed on every call to this FakeImplementation
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }
}

#[allow(dead_code)]
impl<Args, Ret> FakeImplementation<Args, Ret>
where
    Ret: Clone,
{
    /// Set the value that should be returned when this FakeImplementation is invoked
    pub fn set_return_value(&mut self, return_value: Ret) {
        self.return_value = Some(return_value)
    }

    /// Retrieve the configured return value for this FakeImplementation
    pub fn return_value(&self) -> Ret {
        match self.return_value {
            None => panic!("Tried to return from a function where the return value wasn't set!"),
            Some(ref ret_val) => ret_val.clone(),
        }
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    /// Set the result that should be returned when this FakeImplementation is invoked.
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value);
    }

    /// Retrieve the result that should be returned when this FakeImplementation is invoked (for [Result]s)
    pub fn return_value_result(&self) -> Result<Success, Fail> {
        match self.return_value {
            Some(Ok(ref ok_result)) => Ok(ok_result.clone()),
            Some(Err(ref err)) => Err(err.clone()),
            None => panic!("Tried to return from a function where the return value wasn't set!"),
        }
    }
}
