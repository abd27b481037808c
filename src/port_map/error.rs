use core::fmt;

use crate::port_map::table::{Channel, Order, Peripheral};

/// Why a `turn` request was refused. Every variant is raised before any
/// register is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TurnError {
    /// The chip has no pin set for this `(peripheral, order)`.
    UnsupportedCandidate { peripheral: Peripheral, order: Order },
    /// The chip has no pin for this `(peripheral, channel, order)`.
    UnsupportedChannel {
        peripheral: Peripheral,
        channel: Channel,
        order: Order,
    },
    /// Inverted output was asked for on a chip or pin that has none.
    UnsupportedInversion { peripheral: Peripheral, channel: Channel },
    /// `Order::User` with no user function registered.
    MissingUserCallback,
    /// The user function returned false.
    UserFunctionRejected { peripheral: Peripheral },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::UnsupportedCandidate { peripheral, order } => {
                write!(f, "no {:?} pin set for {:?}", order, peripheral)
            }
            TurnError::UnsupportedChannel {
                peripheral,
                channel,
                order,
            } => write!(f, "no {:?} pin for {:?} channel {:?}", order, peripheral, channel),
            TurnError::UnsupportedInversion { peripheral, channel } => {
                write!(f, "{:?} channel {:?} cannot be inverted", peripheral, channel)
            }
            TurnError::MissingUserCallback => write!(f, "no user function registered"),
            TurnError::UserFunctionRejected { peripheral } => {
                write!(f, "user function refused {:?}", peripheral)
            }
        }
    }
}
