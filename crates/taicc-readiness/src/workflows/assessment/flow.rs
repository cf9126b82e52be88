use super::session::Page;

/// Static switches that shape the page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowOptions {
    pub payment_enabled: bool,
}

/// Inputs that may move a session forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    LoginSubmitted,
    PaymentConfirmed { captured: bool },
    AnswersSubmitted { answered: usize, total: usize },
}

impl FlowEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoginSubmitted => "login submitted",
            Self::PaymentConfirmed { .. } => "payment confirmed",
            Self::AnswersSubmitted { .. } => "answers submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("the assessment is complete; no further steps are available")]
    Terminal,
    #[error("'{}' is not accepted on the {} page", .event.label(), .page.label())]
    UnexpectedEvent { page: Page, event: FlowEvent },
    #[error("payment has not been captured yet")]
    PaymentPending,
    #[error("{answered} of {total} questions answered; every question needs a rating")]
    IncompleteAnswers { answered: usize, total: usize },
}

/// Pure transition function. Pages only ever advance.
pub fn transition(page: Page, event: FlowEvent, options: FlowOptions) -> Result<Page, FlowError> {
    match (page, event) {
        (Page::Results, _) => Err(FlowError::Terminal),
        (Page::Login, FlowEvent::LoginSubmitted) => Ok(if options.payment_enabled {
            Page::Payment
        } else {
            Page::Questions
        }),
        (Page::Payment, FlowEvent::PaymentConfirmed { captured: true }) => Ok(Page::Questions),
        (Page::Payment, FlowEvent::PaymentConfirmed { captured: false }) => {
            Err(FlowError::PaymentPending)
        }
        (Page::Questions, FlowEvent::AnswersSubmitted { answered, total }) => {
            if total > 0 && answered >= total {
                Ok(Page::Results)
            } else {
                Err(FlowError::IncompleteAnswers { answered, total })
            }
        }
        (page, event) => Err(FlowError::UnexpectedEvent { page, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATED: FlowOptions = FlowOptions {
        payment_enabled: true,
    };
    const OPEN: FlowOptions = FlowOptions {
        payment_enabled: false,
    };

    #[test]
    fn login_routes_through_payment_only_when_enabled() {
        assert_eq!(
            transition(Page::Login, FlowEvent::LoginSubmitted, GATED),
            Ok(Page::Payment)
        );
        assert_eq!(
            transition(Page::Login, FlowEvent::LoginSubmitted, OPEN),
            Ok(Page::Questions)
        );
    }

    #[test]
    fn payment_requires_capture() {
        assert_eq!(
            transition(
                Page::Payment,
                FlowEvent::PaymentConfirmed { captured: false },
                GATED
            ),
            Err(FlowError::PaymentPending)
        );
        assert_eq!(
            transition(
                Page::Payment,
                FlowEvent::PaymentConfirmed { captured: true },
                GATED
            ),
            Ok(Page::Questions)
        );
    }

    #[test]
    fn questions_submit_requires_every_answer() {
        let complete = FlowEvent::AnswersSubmitted {
            answered: 10,
            total: 10,
        };
        assert_eq!(transition(Page::Questions, complete, OPEN), Ok(Page::Results));

        let partial = FlowEvent::AnswersSubmitted {
            answered: 9,
            total: 10,
        };
        assert_eq!(
            transition(Page::Questions, partial, OPEN),
            Err(FlowError::IncompleteAnswers {
                answered: 9,
                total: 10
            })
        );

        let empty = FlowEvent::AnswersSubmitted {
            answered: 0,
            total: 0,
        };
        assert!(transition(Page::Questions, empty, OPEN).is_err());
    }

    #[test]
    fn results_is_terminal() {
        let events = [
            FlowEvent::LoginSubmitted,
            FlowEvent::PaymentConfirmed { captured: true },
            FlowEvent::AnswersSubmitted {
                answered: 1,
                total: 1,
            },
        ];
        for event in events {
            for options in [GATED, OPEN] {
                assert_eq!(
                    transition(Page::Results, event, options),
                    Err(FlowError::Terminal)
                );
            }
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let err = transition(
            Page::Login,
            FlowEvent::AnswersSubmitted {
                answered: 1,
                total: 1,
            },
            OPEN,
        )
        .expect_err("cannot skip login");
        assert!(matches!(err, FlowError::UnexpectedEvent { page: Page::Login, .. }));
        assert!(err.to_string().contains("Login"));

        assert!(matches!(
            transition(Page::Questions, FlowEvent::LoginSubmitted, OPEN),
            Err(FlowError::UnexpectedEvent { .. })
        ));
        assert!(matches!(
            transition(Page::Questions, FlowEvent::PaymentConfirmed { captured: true }, GATED),
            Err(FlowError::UnexpectedEvent { .. })
        ));
    }
}
