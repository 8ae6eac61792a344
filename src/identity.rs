//! Throwaway signup identities.
//!
//! Each run gets one randomly generated person: a first/last name, an email
//! address derived from the name, and a desktop user-agent string. The email
//! is derived exactly once and reused for the console echo, the form entry,
//! and the identity log.

use rand::seq::SliceRandom;
use rand::Rng;

/// Mail domains the portal accepts without a second look.
pub const EMAIL_DOMAINS: [&str; 5] = [
    "gmail.com",
    "yahoo.com",
    "outlook.com",
    "live.com",
    "aol.com",
];

/// Fallback when the user-agent pool keeps handing us phones.
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

/// How many pool draws to try before settling on the fallback.
const USER_AGENT_DRAWS: usize = 32;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael",
    "Linda", "David", "Elizabeth", "William", "Barbara", "Richard", "Susan",
    "Joseph", "Jessica", "Thomas", "Sarah", "Charles", "Karen", "Christopher",
    "Lisa", "Daniel", "Nancy", "Matthew", "Betty", "Anthony", "Margaret",
    "Mark", "Sandra", "Donald", "Ashley", "Steven", "Kimberly", "Paul",
    "Emily", "Andrew", "Donna", "Joshua", "Michelle", "Kenneth", "Carol",
    "Kevin", "Amanda", "Brian", "Dorothy", "George", "Melissa",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller",
    "Davis", "Rodriguez", "Martinez", "Hernandez", "Lopez", "Gonzalez",
    "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin",
    "Lee", "Perez", "Thompson", "White", "Harris", "Sanchez", "Clark",
    "Ramirez", "Lewis", "Robinson", "Walker", "Young", "Allen", "King",
    "Wright", "Scott", "Torres", "Nguyen", "Hill", "Flores", "Green",
    "Adams", "Nelson", "Baker", "Hall", "Rivera", "Campbell", "Mitchell",
];

/// One generated person, alive for a single signup attempt.
#[derive(Debug, Clone)]
pub struct Identity {
    pub first: String,
    pub last: String,
    pub email: String,
    pub user_agent: String,
}

impl Identity {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let first = FIRST_NAMES
            .choose(&mut rng)
            .copied()
            .unwrap_or("Alex")
            .to_string();
        let last = LAST_NAMES
            .choose(&mut rng)
            .copied()
            .unwrap_or("Morgan")
            .to_string();
        let email = mix_email(&first, &last);
        Self {
            first,
            last,
            email,
            user_agent: desktop_user_agent(),
        }
    }
}

/// Join the two name tokens with a literal `.` in a random order and append a
/// random domain from [`EMAIL_DOMAINS`]. Nothing else is introduced into the
/// local part.
pub fn mix_email(first: &str, last: &str) -> String {
    let mut rng = rand::thread_rng();
    let local = if rng.gen_bool(0.5) {
        format!("{first}.{last}")
    } else {
        format!("{last}.{first}")
    };
    let domain = EMAIL_DOMAINS
        .choose(&mut rng)
        .copied()
        .unwrap_or(EMAIL_DOMAINS[0]);
    format!("{local}@{domain}")
}

/// Draw user-agents from the pool until one satisfies "not Mobile, is
/// Windows"; the pool is finite, so after [`USER_AGENT_DRAWS`] refusals the
/// fixed Windows Chrome string wins.
pub fn desktop_user_agent() -> String {
    for _ in 0..USER_AGENT_DRAWS {
        let ua = fake_user_agent::get_rua();
        if ua.contains("Windows") && !ua.contains("Mobile") {
            return ua.to_string();
        }
    }
    FALLBACK_USER_AGENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain_is_one_of_the_five_literals() {
        for _ in 0..200 {
            let email = mix_email("Ada", "Lovelace");
            let domain = email.split('@').nth(1).expect("email has a domain");
            assert!(
                EMAIL_DOMAINS.contains(&domain),
                "unexpected domain in {email}"
            );
        }
    }

    #[test]
    fn test_email_local_part_is_exactly_the_two_tokens() {
        for _ in 0..200 {
            let email = mix_email("Ada", "Lovelace");
            let local = email.split('@').next().expect("email has a local part");
            assert!(
                local == "Ada.Lovelace" || local == "Lovelace.Ada",
                "unexpected local part in {email}"
            );
        }
    }

    #[test]
    fn test_email_uses_both_orders() {
        let mut saw_first_last = false;
        let mut saw_last_first = false;
        for _ in 0..500 {
            let email = mix_email("Ada", "Lovelace");
            saw_first_last |= email.starts_with("Ada.Lovelace@");
            saw_last_first |= email.starts_with("Lovelace.Ada@");
            if saw_first_last && saw_last_first {
                return;
            }
        }
        panic!("never saw both token orders across 500 draws");
    }

    #[test]
    fn test_generated_identity_is_consistent() {
        let id = Identity::generate();
        assert!(!id.first.is_empty());
        assert!(!id.last.is_empty());
        let local = id.email.split('@').next().unwrap();
        assert!(
            local == format!("{}.{}", id.first, id.last)
                || local == format!("{}.{}", id.last, id.first)
        );
    }

    #[test]
    fn test_user_agent_is_desktop_windows() {
        for _ in 0..20 {
            let ua = desktop_user_agent();
            assert!(ua.contains("Windows"), "not a Windows agent: {ua}");
            assert!(!ua.contains("Mobile"), "mobile agent slipped through: {ua}");
        }
    }
}
