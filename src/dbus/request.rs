use {
    crate::{
        dbus::{DbusConnection, DbusError, DbusTuple, DbusType, IncomingMessage, OutgoingMessage},
        ot_error::OtError,
        utils::errorfmt::ErrorFmt,
    },
    std::rc::Rc,
};

/// One inbound method call.
///
/// Clones share the connection and the message. At most one reply is sent
/// across all clones; later attempts are logged and dropped.
#[derive(Clone)]
pub struct DbusRequest {
    connection: Rc<dyn DbusConnection>,
    message: Rc<IncomingMessage>,
}

impl DbusRequest {
    pub fn new(connection: &Rc<dyn DbusConnection>, message: &Rc<IncomingMessage>) -> Self {
        Self {
            connection: connection.clone(),
            message: message.clone(),
        }
    }

    pub fn connection(&self) -> &Rc<dyn DbusConnection> {
        &self.connection
    }

    pub fn message(&self) -> &Rc<IncomingMessage> {
        &self.message
    }

    /// Decodes the arguments of the call.
    pub fn args<T: DbusTuple>(&self) -> Result<T, DbusError> {
        self.message.read_body()
    }

    pub fn reply<T: DbusTuple>(&self, args: &T) {
        let mut msg = OutgoingMessage::method_return(&self.message);
        msg.append(args);
        self.send_reply(msg);
    }

    /// Replies with an empty return on success and the error's name otherwise.
    pub fn reply_ot_result(&self, res: Result<(), OtError>) {
        match res {
            Ok(()) => self.reply(&()),
            Err(e) => self.reply_ot_error(e),
        }
    }

    /// Replies with `value` as the single element of the body on success.
    pub fn reply_ot_result_with<T: DbusType>(&self, res: Result<T, OtError>) {
        match res {
            Ok(v) => self.reply(&(v,)),
            Err(e) => self.reply_ot_error(e),
        }
    }

    pub fn reply_ot_error(&self, error: OtError) {
        self.send_reply(OutgoingMessage::error(&self.message, error.name()));
    }

    pub fn reply_error(&self, name: &str, text: Option<&str>) {
        let mut msg = OutgoingMessage::error(&self.message, name);
        if let Some(text) = text {
            msg.append(&(text.to_owned(),));
        }
        self.send_reply(msg);
    }

    /// Sends a reply built by the caller.
    pub fn send_reply(&self, msg: OutgoingMessage) {
        if !self.message.mark_replied() {
            log::warn!(
                "Dropping a second reply to {}.{} (serial {})",
                self.message.interface().unwrap_or_default(),
                self.message.member().unwrap_or_default(),
                self.message.serial(),
            );
            return;
        }
        if !self.message.expects_reply() {
            return;
        }
        if let Err(e) = self.connection.send(&msg) {
            log::warn!(
                "Could not send the reply to {}.{}: {}",
                self.message.interface().unwrap_or_default(),
                self.message.member().unwrap_or_default(),
                ErrorFmt(e)
            );
        }
    }
}
