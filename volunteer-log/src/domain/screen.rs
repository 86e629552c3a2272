use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Splash,
    LoginForm,
    TimeEntryForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The splash is done; `signed_in` tells whether a remembered volunteer exists.
    SplashFinished { signed_in: bool },
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {transition:?} on {from:?}")]
pub struct InvalidTransition {
    pub from: Screen,
    pub transition: Transition,
}

impl Screen {
    pub fn apply(self, transition: Transition) -> Result<Screen, InvalidTransition> {
        match (self, transition) {
            (Screen::Splash, Transition::SplashFinished { signed_in: true }) => {
                Ok(Screen::TimeEntryForm)
            }
            (Screen::Splash, Transition::SplashFinished { signed_in: false }) => {
                Ok(Screen::LoginForm)
            }
            (Screen::LoginForm, Transition::SignedIn) => Ok(Screen::TimeEntryForm),
            (Screen::TimeEntryForm, Transition::SignedOut) => Ok(Screen::LoginForm),
            (from, transition) => Err(InvalidTransition { from, transition }),
        }
    }

    /// Screen shown once startup is over.
    pub fn after_startup(signed_in: bool) -> Screen {
        match Screen::Splash.apply(Transition::SplashFinished { signed_in }) {
            Ok(screen) => screen,
            Err(_) => Screen::LoginForm,
        }
    }

    pub fn accepts_entries(self) -> bool {
        self == Screen::TimeEntryForm
    }

    /// What the volunteer can do from this screen.
    pub fn prompt(self) -> &'static str {
        match self {
            Screen::Splash => "Starting up...",
            Screen::LoginForm => "Run `volunteer-log login <VOLUNTEER_ID>` to start logging hours.",
            Screen::TimeEntryForm => "Log hours with `volunteer-log submit`.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_routes_on_remembered_identity() {
        assert_eq!(Screen::after_startup(true), Screen::TimeEntryForm);
        assert_eq!(Screen::after_startup(false), Screen::LoginForm);
        assert_eq!(Screen::default(), Screen::Splash);
    }

    #[test]
    fn sign_in_and_out_cycle() {
        let screen = Screen::LoginForm.apply(Transition::SignedIn).unwrap();
        assert!(screen.accepts_entries());

        let screen = screen.apply(Transition::SignedOut).unwrap();
        assert_eq!(screen, Screen::LoginForm);
        assert!(!screen.accepts_entries());
    }

    #[test]
    fn rejects_transitions_that_make_no_sense() {
        let err = Screen::LoginForm
            .apply(Transition::SignedOut)
            .unwrap_err();
        assert_eq!(err.from, Screen::LoginForm);
        assert_eq!(err.transition, Transition::SignedOut);

        assert!(Screen::TimeEntryForm.apply(Transition::SignedIn).is_err());
        assert!(Screen::Splash.apply(Transition::SignedIn).is_err());
        assert!(Screen::TimeEntryForm
            .apply(Transition::SplashFinished { signed_in: true })
            .is_err());
    }

    #[test]
    fn prompt_follows_the_screen() {
        assert!(Screen::LoginForm.prompt().contains("login"));
        assert!(Screen::TimeEntryForm.prompt().contains("submit"));
        let after_logout = Screen::TimeEntryForm.apply(Transition::SignedOut).unwrap();
        assert_eq!(after_logout.prompt(), Screen::LoginForm.prompt());
    }
}
