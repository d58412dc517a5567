//! Single-deck blackjack against the house
//!
//! The server is stateless between requests: the full table state (deck
//! included) is serialized, signed, and round-tripped through the client.
//! The API layer rejects any state blob whose signature does not verify,
//! so a client can look at the bytes but not deal itself better cards.
//!
//! Rules: dealer stands on 17, wins pay 2x the stake, pushes return it,
//! a natural two-card 21 pays 2.5x unless the dealer also has one.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crash::distribution::UniformSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Face value with aces high; [`hand_value`] demotes aces as needed.
    fn value(self) -> u32 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub value: Rank,
}

/// Best hand total: aces count 11, then drop to 1 one at a time while the
/// hand busts.
pub fn hand_value(hand: &[Card]) -> u32 {
    let mut value: u32 = hand.iter().map(|c| c.value.value()).sum();
    let mut aces = hand.iter().filter(|c| c.value == Rank::Ace).count();
    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }
    value
}

/// Full 52-card deck, unshuffled.
pub fn fresh_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs] {
        for value in Rank::ALL {
            deck.push(Card { suit, value });
        }
    }
    deck
}

/// Fisher-Yates off the injected uniform source.
pub fn shuffle(deck: &mut [Card], uniform: &mut UniformSource) {
    for i in (1..deck.len()).rev() {
        let j = (uniform() * (i + 1) as f64) as usize;
        deck.swap(i, j.min(i));
    }
}

/// What the player may do with a live hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerAction {
    Hit,
    Stand,
}

/// How a finished hand resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandResult {
    Blackjack,
    Win,
    Push,
    Lose,
    Bust,
}

impl HandResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandResult::Blackjack => "blackjack",
            HandResult::Win => "win",
            HandResult::Push => "push",
            HandResult::Lose => "lose",
            HandResult::Bust => "bust",
        }
    }
}

/// A settled hand and what it pays
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    pub result: HandResult,
    pub win_amount: u64,
}

/// The complete table, round-tripped through the client between actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableState {
    /// Identifies the hand across requests; the API keeps live ids
    /// server-side so a settled blob cannot be replayed.
    pub hand_id: Uuid,
    pub deck: Vec<Card>,
    pub player: Vec<Card>,
    pub dealer: Vec<Card>,
    pub bet: u64,
    pub finished: bool,
}

impl TableState {
    /// Shuffle a fresh deck and deal two cards each.
    pub fn deal(uniform: &mut UniformSource, bet: u64) -> Self {
        let mut deck = fresh_deck();
        shuffle(&mut deck, uniform);
        let mut draw = || deck.pop();
        let player = vec![draw().unwrap_or(FALLBACK), draw().unwrap_or(FALLBACK)];
        let dealer = vec![draw().unwrap_or(FALLBACK), draw().unwrap_or(FALLBACK)];
        let finished = hand_value(&player) == 21;
        Self {
            hand_id: Uuid::new_v4(),
            deck,
            player,
            dealer,
            bet,
            finished,
        }
    }

    pub fn player_value(&self) -> u32 {
        hand_value(&self.player)
    }

    pub fn dealer_value(&self) -> u32 {
        hand_value(&self.dealer)
    }

    /// The one dealer card shown while the hand is live.
    pub fn dealer_upcard(&self) -> Card {
        self.dealer[0]
    }

    /// Two-card 21 off the deal.
    pub fn is_natural(&self) -> bool {
        self.player.len() == 2 && self.player_value() == 21
    }

    /// Settle a natural immediately: 2.5x, or a push if the dealer also
    /// has one.
    pub fn settle_natural(&self) -> Settlement {
        if self.dealer_value() == 21 {
            Settlement {
                result: HandResult::Push,
                win_amount: self.bet,
            }
        } else {
            Settlement {
                result: HandResult::Blackjack,
                win_amount: self.bet * 5 / 2,
            }
        }
    }

    /// Draw one card for the player. Returns the settlement when the hand
    /// busts, `None` while it is still live.
    pub fn hit(&mut self) -> Option<Settlement> {
        if let Some(card) = self.deck.pop() {
            self.player.push(card);
        }
        if self.player_value() > 21 {
            self.finished = true;
            Some(Settlement {
                result: HandResult::Bust,
                win_amount: 0,
            })
        } else {
            None
        }
    }

    /// Stand: the dealer draws to 17, then hands are compared.
    pub fn stand(&mut self) -> Settlement {
        while self.dealer_value() < 17 {
            match self.deck.pop() {
                Some(card) => self.dealer.push(card),
                None => break,
            }
        }
        self.finished = true;

        let player = self.player_value();
        let dealer = self.dealer_value();
        let (result, win_amount) = if dealer > 21 || player > dealer {
            (HandResult::Win, self.bet * 2)
        } else if player == dealer {
            (HandResult::Push, self.bet)
        } else {
            (HandResult::Lose, 0)
        };
        Settlement { result, win_amount }
    }
}

/// Unreachable with a 52-card deck; keeps dealing total.
const FALLBACK: Card = Card {
    suit: Suit::Spades,
    value: Rank::Two,
};
