//! Session-Store – Verwaltet Sessions, Spieler und Join-Codes
//!
//! Haelt den ephemeren Zustand aller Sessions im Speicher. Zugriff ueber
//! Session-ID, Join-Code oder Verbindungs-ID (Host oder Spieler).
//!
//! ## Nebenlaeufigkeit
//! - Jede Session liegt hinter einem eigenen `Mutex`. Alle Mutationen einer
//!   Session (Join, Leave, Start, Entfernen) laufen darin serialisiert.
//! - Sessions untereinander blockieren sich nicht; die Indizes sind DashMaps.
//! - Lock-Reihenfolge: Session-Mutex vor DashMap-Shard. Es wird nie ein
//!   DashMap-Guard gehalten waehrend ein Session-Mutex gesperrt wird, und nie
//!   zwei DashMap-Guards gleichzeitig.
//! - Join-Antworten werden noch unter dem Session-Mutex eingereiht
//!   (`spieler_hinzufuegen_mit`), damit `session-joined` beim Spieler vor
//!   `game-started` oder `session-ended` ankommt.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use partyhub_core::types::{ConnectionId, PlayerId, SessionId, SessionState};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Join-Codes
// ---------------------------------------------------------------------------

/// Alphabet fuer Join-Codes (ohne 0/O und 1/I)
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Laenge eines Join-Codes
pub const CODE_LAENGE: usize = 4;

/// Maximale Anzahl Versuche einen freien Code zu finden
const MAX_CODE_VERSUCHE: usize = 10_000;

/// Erzeugt einen zufaelligen Join-Code
pub fn code_erzeugen<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LAENGE)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalisiert einen vom Menschen eingegebenen Code (Gross-/Kleinschreibung egal)
pub fn code_normalisieren(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Player / Session
// ---------------------------------------------------------------------------

/// Teilnehmer einer Session (nicht der Host)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub connection_id: ConnectionId,
    pub name: String,
    /// Wird beim Beitritt vergeben und nie neu zugewiesen
    pub player_index: u32,
}

/// Eine Party-Session mit genau einem Host
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub code: String,
    pub host_connection_id: ConnectionId,
    pub game_id: String,
    pub players: Vec<Player>,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    /// Naechster zu vergebender Spieler-Index (monoton steigend)
    naechster_index: u32,
}

impl Session {
    fn neu(id: SessionId, code: String, host: ConnectionId, game_id: String) -> Self {
        Self {
            id,
            code,
            host_connection_id: host,
            game_id,
            players: Vec::new(),
            state: SessionState::Lobby,
            created_at: Utc::now(),
            naechster_index: 0,
        }
    }

    /// Prueft ob die Verbindung der Host dieser Session ist
    pub fn ist_host(&self, connection_id: &ConnectionId) -> bool {
        &self.host_connection_id == connection_id
    }

    /// Sucht den Spieler zu einer Verbindung
    pub fn spieler_nach_verbindung(&self, connection_id: &ConnectionId) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| &p.connection_id == connection_id)
    }

    /// Verbindungs-IDs aller aktuellen Spieler (ohne Host)
    pub fn spieler_verbindungen(&self) -> Vec<ConnectionId> {
        self.players.iter().map(|p| p.connection_id.clone()).collect()
    }

    /// Oeffentliche Kurzinfo fuer den REST-Lookup
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            code: self.code.clone(),
            game_id: self.game_id.clone(),
            state: self.state,
            player_count: self.players.len(),
        }
    }
}

/// Lesende Sicht auf eine Session (`GET /api/sessions/{code}`)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub code: String,
    pub game_id: String,
    pub state: SessionState,
    pub player_count: usize,
}

/// Ergebnis von `spiel_starten`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartErgebnis {
    /// Session laeuft; Verbindungen der zu benachrichtigenden Spieler
    Gestartet(Vec<ConnectionId>),
    /// Anfragende Verbindung ist nicht der Host
    NichtHost,
    /// Session existiert nicht (mehr)
    Unbekannt,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// In-Memory Store fuer alle Sessions
///
/// Thread-safe via Arc + DashMap + Mutex pro Session. Clone teilt den
/// inneren Zustand.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    /// Sessions, indiziert nach SessionId
    sessions: DashMap<SessionId, Arc<Mutex<Session>>>,
    /// Join-Code (Grossbuchstaben) -> SessionId
    codes: DashMap<String, SessionId>,
    /// Verbindung (Host oder Spieler) -> SessionId
    verbindungen: DashMap<ConnectionId, SessionId>,
    /// Beitritt zu laufenden Spielen erlaubt
    late_join: bool,
}

impl SessionStore {
    /// Erstellt einen neuen, leeren SessionStore
    pub fn neu(late_join: bool) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: DashMap::new(),
                codes: DashMap::new(),
                verbindungen: DashMap::new(),
                late_join,
            }),
        }
    }

    /// Legt eine neue Session an, die Verbindung wird Host
    ///
    /// Der Join-Code wird so lange neu gewuerfelt bis kein lebende Session
    /// ihn haelt.
    pub fn session_erstellen(
        &self,
        host: &ConnectionId,
        game_id: impl Into<String>,
    ) -> SignalingResult<Session> {
        if self.inner.verbindungen.contains_key(host) {
            return Err(SignalingError::BereitsInSession);
        }

        let game_id = game_id.into();
        loop {
            let session_id = SessionId::new();
            let code = self.code_reservieren(&session_id)?;

            match self.inner.sessions.entry(session_id.clone()) {
                Entry::Occupied(_) => {
                    // ID-Kollision: Code freigeben und neu versuchen
                    self.inner.codes.remove(&code);
                    continue;
                }
                Entry::Vacant(eintrag) => {
                    let session = Session::neu(session_id.clone(), code, host.clone(), game_id);
                    eintrag.insert(Arc::new(Mutex::new(session.clone())));
                    self.inner
                        .verbindungen
                        .insert(host.clone(), session_id.clone());

                    tracing::info!(
                        session_id = %session.id,
                        code = %session.code,
                        host = %host,
                        game_id = %session.game_id,
                        "Session erstellt"
                    );
                    return Ok(session);
                }
            }
        }
    }

    /// Sucht eine Session per Join-Code (Gross-/Kleinschreibung egal)
    pub fn nach_code(&self, code: &str) -> Option<Session> {
        let session_id = self.inner.codes.get(&code_normalisieren(code))?.clone();
        self.nach_id(&session_id)
    }

    /// Sucht eine Session per ID
    pub fn nach_id(&self, session_id: &SessionId) -> Option<Session> {
        let eintrag = self.eintrag(session_id)?;
        let session = eintrag.lock();
        session.state.ist_aktiv().then(|| session.clone())
    }

    /// Sucht die Session in der die Verbindung Host oder Spieler ist
    pub fn nach_verbindung(&self, connection_id: &ConnectionId) -> Option<Session> {
        let session_id = self.inner.verbindungen.get(connection_id)?.clone();
        self.nach_id(&session_id)
    }

    /// Fuegt einer Session einen Spieler hinzu
    ///
    /// Index-Vergabe und Einfuegen passieren atomar unter dem Session-Mutex,
    /// gleichzeitige Joins bekommen daher nie denselben Index.
    pub fn spieler_hinzufuegen(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        name: impl Into<String>,
    ) -> SignalingResult<Player> {
        self.spieler_hinzufuegen_mit(session_id, connection_id, name, |_, _| {})
    }

    /// Wie `spieler_hinzufuegen`, `bei_beitritt` laeuft noch unter dem Session-Mutex
    ///
    /// Nachrichten die dort eingereiht werden liegen vor allem was ein
    /// spaeteres Start oder Entfernen derselben Session an den Spieler schickt.
    /// `bei_beitritt` darf nur nicht-blockierend senden und keinen Store-Zugriff
    /// machen.
    pub fn spieler_hinzufuegen_mit<F>(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
        name: impl Into<String>,
        bei_beitritt: F,
    ) -> SignalingResult<Player>
    where
        F: FnOnce(&Session, &Player),
    {
        if self.inner.verbindungen.contains_key(connection_id) {
            return Err(SignalingError::BereitsInSession);
        }

        let eintrag = self
            .eintrag(session_id)
            .ok_or_else(|| SignalingError::SessionNichtGefunden(session_id.to_string()))?;

        let mut session = eintrag.lock();
        match session.state {
            SessionState::Ended => return Err(SignalingError::SessionBeendet),
            SessionState::Playing if !self.inner.late_join => {
                return Err(SignalingError::LobbyGesperrt)
            }
            _ => {}
        }

        let player = Player {
            id: PlayerId::new(),
            connection_id: connection_id.clone(),
            name: name.into(),
            player_index: session.naechster_index,
        };
        session.naechster_index += 1;
        session.players.push(player.clone());
        self.inner
            .verbindungen
            .insert(connection_id.clone(), session_id.clone());

        tracing::debug!(
            session_id = %session_id,
            player_id = %player.id,
            player_index = player.player_index,
            "Spieler hinzugefuegt"
        );
        bei_beitritt(&*session, &player);
        Ok(player)
    }

    /// Entfernt den Spieler mit dieser Verbindung aus der Session
    ///
    /// Idempotent: gibt `None` zurueck wenn kein solcher Spieler existiert.
    pub fn spieler_entfernen(
        &self,
        session_id: &SessionId,
        connection_id: &ConnectionId,
    ) -> Option<Player> {
        let eintrag = self.eintrag(session_id)?;
        let mut session = eintrag.lock();

        let position = session
            .players
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        let player = session.players.remove(position);
        self.inner
            .verbindungen
            .remove_if(connection_id, |_, sid| sid == session_id);

        tracing::debug!(
            session_id = %session_id,
            player_id = %player.id,
            player_index = player.player_index,
            "Spieler entfernt"
        );
        Some(player)
    }

    /// Startet das Spiel, wenn die anfragende Verbindung der Host ist
    pub fn spiel_starten(
        &self,
        session_id: &SessionId,
        anfragender: &ConnectionId,
    ) -> StartErgebnis {
        let Some(eintrag) = self.eintrag(session_id) else {
            return StartErgebnis::Unbekannt;
        };
        let mut session = eintrag.lock();

        if !session.state.ist_aktiv() {
            return StartErgebnis::Unbekannt;
        }
        if !session.ist_host(anfragender) {
            return StartErgebnis::NichtHost;
        }

        session.state = SessionState::Playing;
        StartErgebnis::Gestartet(session.spieler_verbindungen())
    }

    /// Entfernt eine Session und gibt ihren Join-Code frei
    ///
    /// Gibt den letzten Stand der Session (mit allen Spielern) zurueck.
    pub fn session_entfernen(&self, session_id: &SessionId) -> Option<Session> {
        let (_, eintrag) = self.inner.sessions.remove(session_id)?;
        let mut session = eintrag.lock();
        session.state = SessionState::Ended;

        self.inner.codes.remove_if(&session.code, |_, sid| sid == session_id);
        self.inner
            .verbindungen
            .remove_if(&session.host_connection_id, |_, sid| sid == session_id);
        for player in &session.players {
            self.inner
                .verbindungen
                .remove_if(&player.connection_id, |_, sid| sid == session_id);
        }

        tracing::info!(
            session_id = %session_id,
            code = %session.code,
            spieler = session.players.len(),
            "Session entfernt"
        );
        Some(session.clone())
    }

    /// Gibt die Anzahl lebender Sessions zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Prueft ob ein Code aktuell vergeben ist
    pub fn code_vergeben(&self, code: &str) -> bool {
        self.inner.codes.contains_key(&code_normalisieren(code))
    }

    // -----------------------------------------------------------------------
    // Interne Hilfsmethoden
    // -----------------------------------------------------------------------

    fn eintrag(&self, session_id: &SessionId) -> Option<Arc<Mutex<Session>>> {
        self.inner.sessions.get(session_id).map(|e| Arc::clone(e.value()))
    }

    /// Wuerfelt Codes bis einer frei ist und reserviert ihn atomar
    fn code_reservieren(&self, session_id: &SessionId) -> SignalingResult<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_CODE_VERSUCHE {
            let code = code_erzeugen(&mut rng);
            if let Entry::Vacant(eintrag) = self.inner.codes.entry(code.clone()) {
                eintrag.insert(session_id.clone());
                return Ok(code);
            }
        }
        tracing::error!("Kein freier Join-Code gefunden");
        Err(SignalingError::KeinCodeFrei)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn conn(name: &str) -> ConnectionId {
        ConnectionId::from(name)
    }

    #[test]
    fn codes_haben_laenge_und_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = code_erzeugen(&mut rng);
            assert_eq!(code.len(), CODE_LAENGE);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', '1', 'I']));
        }
    }

    #[test]
    fn lebende_sessions_haben_verschiedene_codes() {
        let store = SessionStore::neu(true);
        let mut codes = HashSet::new();
        for i in 0..500 {
            let session = store
                .session_erstellen(&conn(&format!("host-{i}")), "pong")
                .unwrap();
            assert!(codes.insert(session.code), "Code doppelt vergeben");
        }
        assert_eq!(store.anzahl(), 500);
    }

    #[test]
    fn code_suche_ignoriert_gross_klein() {
        let store = SessionStore::neu(true);
        let session = store.session_erstellen(&conn("host"), "pong").unwrap();

        let klein = session.code.to_lowercase();
        let gefunden = store.nach_code(&klein).expect("Session muss gefunden werden");
        assert_eq!(gefunden.id, session.id);
        assert_eq!(gefunden.state, SessionState::Lobby);
        assert!(store.nach_code("ZZZZ0").is_none());
    }

    #[test]
    fn nach_verbindung_findet_host_und_spieler() {
        let store = SessionStore::neu(true);
        let session = store.session_erstellen(&conn("host"), "pong").unwrap();
        store
            .spieler_hinzufuegen(&session.id, &conn("p1"), "Alice")
            .unwrap();

        assert_eq!(store.nach_verbindung(&conn("host")).unwrap().id, session.id);
        assert_eq!(store.nach_verbindung(&conn("p1")).unwrap().id, session.id);
        assert!(store.nach_verbindung(&conn("fremd")).is_none());
    }

    #[test]
    fn spieler_index_wird_nie_wiederverwendet() {
        let store = SessionStore::neu(true);
        let session = store.session_erstellen(&conn("host"), "pong").unwrap();

        let a = store.spieler_hinzufuegen(&session.id, &conn("a"), "A").unwrap();
        let b = store.spieler_hinzufuegen(&session.id, &conn("b"), "B").unwrap();
        assert_eq!((a.player_index, b.player_index), (0, 1));

        store.spieler_entfernen(&session.id, &conn("a")).unwrap();
        let c = store.spieler_hinzufuegen(&session.id, &conn("c"), "C").unwrap();
        assert_eq!(c.player_index, 2);

        let indizes: Vec<u32> = store
            .nach_id(&session.id)
            .unwrap()
            .players
            .iter()
            .map(|p| p.player_index)
            .collect();
        assert_eq!(indizes, vec![1, 2]);
    }

    #[test]
    fn spieler_entfernen_ist_idempotent() {
        let store = SessionStore::neu(true);
        let session = store.session_erstellen(&conn("host"), "pong").unwrap();
        store.spieler_hinzufuegen(&session.id, &conn("a"), "A").unwrap();

        assert!(store.spieler_entfernen(&session.id, &conn("a")).is_some());
        assert!(store.spieler_entfernen(&session.id, &conn("a")).is_none());
        assert!(store.nach_verbindung(&conn("a")).is_none());
    }

    #[test]
    fn hinzufuegen_zu_unbekannter_session_schlaegt_fehl() {
        let store = SessionStore::neu(true);
        let result = store.spieler_hinzufuegen(&SessionId::new(), &conn("a"), "A");
        assert!(matches!(result, Err(SignalingError::SessionNichtGefunden(_))));
    }

    #[test]
    fn verbindung_nur_in_einer_session() {
        let store = SessionStore::neu(true);
        let s1 = store.session_erstellen(&conn("host"), "pong").unwrap();
        assert!(matches!(
            store.session_erstellen(&conn("host"), "pong"),
            Err(SignalingError::BereitsInSession)
        ));

        store.spieler_hinzufuegen(&s1.id, &conn("a"), "A").unwrap();
        assert!(matches!(
            store.spieler_hinzufuegen(&s1.id, &conn("a"), "A"),
            Err(SignalingError::BereitsInSession)
        ));
    }

    #[test]
    fn spaeter_beitritt_konfigurierbar() {
        let offen = SessionStore::neu(true);
        let s = offen.session_erstellen(&conn("host"), "pong").unwrap();
        offen.spiel_starten(&s.id, &conn("host"));
        assert!(offen.spieler_hinzufuegen(&s.id, &conn("a"), "A").is_ok());

        let gesperrt = SessionStore::neu(false);
        let s = gesperrt.session_erstellen(&conn("host"), "pong").unwrap();
        gesperrt.spiel_starten(&s.id, &conn("host"));
        assert!(matches!(
            gesperrt.spieler_hinzufuegen(&s.id, &conn("a"), "A"),
            Err(SignalingError::LobbyGesperrt)
        ));
    }

    #[test]
    fn nur_host_darf_starten() {
        let store = SessionStore::neu(true);
        let s = store.session_erstellen(&conn("host"), "pong").unwrap();
        store.spieler_hinzufuegen(&s.id, &conn("a"), "A").unwrap();

        assert_eq!(store.spiel_starten(&s.id, &conn("a")), StartErgebnis::NichtHost);
        assert_eq!(store.nach_id(&s.id).unwrap().state, SessionState::Lobby);

        assert_eq!(
            store.spiel_starten(&s.id, &conn("host")),
            StartErgebnis::Gestartet(vec![conn("a")])
        );
        assert_eq!(store.nach_id(&s.id).unwrap().state, SessionState::Playing);
    }

    #[test]
    fn session_entfernen_gibt_code_frei() {
        let store = SessionStore::neu(true);
        let s = store.session_erstellen(&conn("host"), "pong").unwrap();
        store.spieler_hinzufuegen(&s.id, &conn("a"), "A").unwrap();

        let entfernt = store.session_entfernen(&s.id).unwrap();
        assert_eq!(entfernt.state, SessionState::Ended);
        assert_eq!(entfernt.players.len(), 1);

        assert!(store.nach_id(&s.id).is_none());
        assert!(store.nach_code(&s.code).is_none());
        assert!(!store.code_vergeben(&s.code));
        assert!(store.nach_verbindung(&conn("host")).is_none());
        assert!(store.nach_verbindung(&conn("a")).is_none());
        assert_eq!(store.anzahl(), 0);

        // Zweites Entfernen ist ein No-op
        assert!(store.session_entfernen(&s.id).is_none());
    }

    #[test]
    fn beitritt_zu_entfernter_session_schlaegt_fehl() {
        let store = SessionStore::neu(true);
        let s = store.session_erstellen(&conn("host"), "pong").unwrap();
        store.session_entfernen(&s.id);
        assert!(store.spieler_hinzufuegen(&s.id, &conn("a"), "A").is_err());
    }

    #[test]
    fn beitritts_callback_sieht_neuen_spieler() {
        let store = SessionStore::neu(true);
        let s = store.session_erstellen(&conn("host"), "pong").unwrap();

        let mut gesehen = None;
        store
            .spieler_hinzufuegen_mit(&s.id, &conn("a"), "A", |session, player| {
                gesehen = Some((session.players.len(), player.player_index));
            })
            .unwrap();
        assert_eq!(gesehen, Some((1, 0)));

        // Abgelehnter Beitritt ruft den Callback nicht auf
        store.session_entfernen(&s.id);
        let mut aufgerufen = false;
        let result = store.spieler_hinzufuegen_mit(&s.id, &conn("b"), "B", |_, _| aufgerufen = true);
        assert!(result.is_err());
        assert!(!aufgerufen);
    }

    #[test]
    fn gleichzeitige_joins_vergeben_lueckenlose_indizes() {
        let store = SessionStore::neu(true);
        let s = store.session_erstellen(&conn("host"), "pong").unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                let sid = s.id.clone();
                std::thread::spawn(move || {
                    store
                        .spieler_hinzufuegen(&sid, &conn(&format!("p{i}")), format!("P{i}"))
                        .unwrap()
                        .player_index
                })
            })
            .collect();

        let mut indizes: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        indizes.sort_unstable();
        assert_eq!(indizes, (0..32).collect::<Vec<u32>>());
    }
}
