//! User-facing German message catalog.
//!
//! Every string a client can see comes from here; handlers and services
//! reference a `Msg` variant instead of inlining text.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    // Authentication
    TokenMissing,
    TokenInvalid,
    TokenExpired,
    AdminRequired,
    CompanyAccessDenied,

    // Requests
    InvalidJson,
    ValidationFailed,
    FieldRequired,
    SystemFieldNotAllowed,
    UnknownCollection,
    InvalidFilter,

    // Companies
    CompanyNotFound,
    CompanyLocked,
    CompanyNotLocked,
    CompanyDeleted,
    CompanyLockedNow,
    CompanyUnlockedNow,
    ProtectedCompanyField,

    // Finance documents
    DocumentNotFound,
    OnlyDraftsEditable,
    OnlyDraftsDeletable,
    InvalidTransition,
    StornoOfStorno,
    StornoOfCancelled,
    StornoOfDraft,
    StornoCreated,
    QuoteNotAccepted,
    DocumentSent,
    DocumentSentMailFailed,
    RecipientMissing,
    UnknownDocumentKind,
    AmountOutOfRange,

    // Number sequences
    UnknownSequenceType,
    SequenceNumberTooLow,
    SequenceNumberTooHigh,
    SequenceExhausted,
    SequenceFormatInvalid,

    // Banking
    TransactionNotFound,
    LinkExists,
    LinkNotFound,

    // Email
    EmailConfigNotFound,
    EmailMessageNotFound,

    // Admin
    TicketNotFound,
    WorkspaceNotFound,
    TaskNotFound,
    CommentEmpty,

    // Webhooks and OAuth
    SignatureMissing,
    SignatureInvalid,
    WebhookNotConfigured,
    WebhookPayloadInvalid,
    OAuthStateInvalid,
    OAuthNotConfigured,
    OAuthExchangeFailed,

    // Generic
    RecordNotFound,
    Conflict,
    InternalError,
    StoreUnavailable,
    UpstreamUnavailable,
}

impl Msg {
    pub fn text(self) -> &'static str {
        match self {
            Msg::TokenMissing => "Nicht authentifiziert. Bitte melden Sie sich an.",
            Msg::TokenInvalid => "Ungültiges Authentifizierungs-Token.",
            Msg::TokenExpired => "Ihre Sitzung ist abgelaufen. Bitte melden Sie sich erneut an.",
            Msg::AdminRequired => "Administratorrechte erforderlich.",
            Msg::CompanyAccessDenied => "Kein Zugriff auf dieses Unternehmen.",

            Msg::InvalidJson => "Ungültige Anfrage: JSON konnte nicht gelesen werden.",
            Msg::ValidationFailed => "Die Eingaben sind unvollständig oder ungültig.",
            Msg::FieldRequired => "Dieses Feld ist erforderlich.",
            Msg::SystemFieldNotAllowed => "Systemfelder können nicht gesetzt werden.",
            Msg::UnknownCollection => "Unbekannte Datensammlung.",
            Msg::InvalidFilter => "Ungültiger Filter.",

            Msg::CompanyNotFound => "Unternehmen nicht gefunden.",
            Msg::CompanyLocked => "Das Unternehmenskonto ist gesperrt und kann nicht gelöscht werden. Bitte zuerst entsperren.",
            Msg::CompanyNotLocked => "Das Unternehmenskonto ist nicht gesperrt.",
            Msg::CompanyDeleted => "Unternehmen wurde gelöscht.",
            Msg::CompanyLockedNow => "Unternehmenskonto wurde gesperrt.",
            Msg::CompanyUnlockedNow => "Unternehmenskonto wurde entsperrt.",
            Msg::ProtectedCompanyField => "Dieses Feld kann nur vom System geändert werden.",

            Msg::DocumentNotFound => "Dokument nicht gefunden.",
            Msg::OnlyDraftsEditable => "Nur Entwürfe können bearbeitet werden.",
            Msg::OnlyDraftsDeletable => "Nur Entwürfe können gelöscht werden.",
            Msg::InvalidTransition => "Dieser Statuswechsel ist nicht erlaubt.",
            Msg::StornoOfStorno => "Eine Stornorechnung kann nicht storniert werden.",
            Msg::StornoOfCancelled => "Die Rechnung wurde bereits storniert.",
            Msg::StornoOfDraft => "Entwürfe können nicht storniert werden. Bitte löschen Sie den Entwurf.",
            Msg::StornoCreated => "Stornorechnung wurde erstellt.",
            Msg::QuoteNotAccepted => "Nur angenommene Angebote können in eine Rechnung umgewandelt werden.",
            Msg::DocumentSent => "Dokument wurde versendet.",
            Msg::DocumentSentMailFailed => "Status wurde aktualisiert, aber die E-Mail konnte nicht zugestellt werden.",
            Msg::RecipientMissing => "Keine Empfänger-E-Mail-Adresse vorhanden.",
            Msg::UnknownDocumentKind => "Unbekannter Dokumenttyp.",
            Msg::AmountOutOfRange => "Menge oder Preis liegen außerhalb des zulässigen Bereichs.",

            Msg::UnknownSequenceType => "Unbekannter Nummerkreis-Typ.",
            Msg::SequenceNumberTooLow => "Die nächste Nummer darf nicht kleiner als die aktuelle sein.",
            Msg::SequenceNumberTooHigh => "Die nächste Nummer überschreitet den zulässigen Bereich.",
            Msg::SequenceExhausted => "Der Nummernkreis ist ausgeschöpft. Bitte passen Sie das Format an.",
            Msg::SequenceFormatInvalid => "Ungültiges Nummernformat.",

            Msg::TransactionNotFound => "Transaktion nicht gefunden.",
            Msg::LinkExists => "Transaktion und Dokument sind bereits verknüpft.",
            Msg::LinkNotFound => "Verknüpfung nicht gefunden.",

            Msg::EmailConfigNotFound => "Keine E-Mail-Konfiguration vorhanden.",
            Msg::EmailMessageNotFound => "E-Mail nicht gefunden.",

            Msg::TicketNotFound => "Ticket nicht gefunden.",
            Msg::WorkspaceNotFound => "Workspace nicht gefunden.",
            Msg::TaskNotFound => "Aufgabe nicht gefunden.",
            Msg::CommentEmpty => "Kommentar darf nicht leer sein.",

            Msg::SignatureMissing => "Keine Signatur vorhanden.",
            Msg::SignatureInvalid => "Ungültige Webhook-Signatur.",
            Msg::WebhookNotConfigured => "Webhook ist nicht konfiguriert.",
            Msg::WebhookPayloadInvalid => "Ungültige Webhook-Daten.",
            Msg::OAuthStateInvalid => "Ungültige oder abgelaufene Autorisierungsanfrage.",
            Msg::OAuthNotConfigured => "Die Integration ist nicht konfiguriert.",
            Msg::OAuthExchangeFailed => "Die Verbindung mit dem Anbieter ist fehlgeschlagen.",

            Msg::RecordNotFound => "Datensatz nicht gefunden.",
            Msg::Conflict => "Der Datensatz wurde zwischenzeitlich geändert. Bitte erneut versuchen.",
            Msg::InternalError => "Ein interner Fehler ist aufgetreten.",
            Msg::StoreUnavailable => "Die Datenbank ist vorübergehend nicht erreichbar.",
            Msg::UpstreamUnavailable => "Ein externer Dienst ist vorübergehend nicht erreichbar.",
        }
    }
}

impl std::fmt::Display for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}
